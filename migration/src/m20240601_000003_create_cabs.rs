use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cab::Table)
                    .if_not_exists()
                    .col(uuid(Cab::Id).primary_key())
                    .col(string_len(Cab::Registration, 20).not_null().unique_key())
                    .col(string_len(Cab::Model, 100).not_null())
                    .col(integer(Cab::Capacity).not_null())
                    .col(timestamp_with_time_zone(Cab::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Cab::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Cab {
    Table,
    Id,
    Registration,
    Model,
    Capacity,
    CreatedAt,
}
