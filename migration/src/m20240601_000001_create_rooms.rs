use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Room::Table)
                    .if_not_exists()
                    .col(uuid(Room::Id).primary_key())
                    .col(string_len(Room::RoomNumber, 20).not_null().unique_key())
                    .col(string_len(Room::RoomType, 50).not_null())
                    .col(big_integer(Room::NightlyRate).not_null())
                    .col(string_len(Room::Status, 20).not_null())
                    .col(boolean(Room::UnderMaintenance).not_null().default(false))
                    .col(string_len(Room::CleanStatus, 20).not_null())
                    .col(timestamp_with_time_zone(Room::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Room::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Room::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Room {
    Table,
    Id,
    RoomNumber,
    RoomType,
    NightlyRate,
    Status,
    UnderMaintenance,
    CleanStatus,
    CreatedAt,
    UpdatedAt,
}
