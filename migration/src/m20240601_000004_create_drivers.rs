use sea_orm_migration::{prelude::*, schema::*};

use super::m20240601_000002_create_users::User;
use super::m20240601_000003_create_cabs::Cab;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Driver::Table)
                    .if_not_exists()
                    .col(uuid(Driver::Id).primary_key())
                    .col(string_len(Driver::Status, 20).not_null())
                    .col(uuid_null(Driver::CabId))
                    .col(timestamp_with_time_zone(Driver::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_driver_user")
                            .from(Driver::Table, Driver::Id)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_driver_cab")
                            .from(Driver::Table, Driver::CabId)
                            .to(Cab::Table, Cab::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Driver search filters on status and orders by updated_at
        manager
            .create_index(
                Index::create()
                    .name("idx_driver_status_updated")
                    .table(Driver::Table)
                    .col(Driver::Status)
                    .col(Driver::UpdatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Driver::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Driver {
    Table,
    Id,
    Status,
    CabId,
    UpdatedAt,
}
