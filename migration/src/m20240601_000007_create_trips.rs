use sea_orm_migration::{prelude::*, schema::*};

use super::m20240601_000003_create_cabs::Cab;
use super::m20240601_000004_create_drivers::Driver;
use super::m20240601_000005_create_bookings::Booking;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Trip::Table)
                    .if_not_exists()
                    .col(uuid(Trip::Id).primary_key())
                    .col(uuid(Trip::BookingId).not_null())
                    .col(string_len(Trip::PickUp, 255).not_null())
                    .col(string_len(Trip::DropOff, 255).not_null())
                    .col(timestamp_with_time_zone_null(Trip::PickupTime))
                    .col(uuid_null(Trip::CabId))
                    .col(uuid_null(Trip::DriverId))
                    .col(string_len(Trip::Status, 20).not_null())
                    .col(timestamp_with_time_zone(Trip::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Trip::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_booking")
                            .from(Trip::Table, Trip::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_cab")
                            .from(Trip::Table, Trip::CabId)
                            .to(Cab::Table, Cab::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_driver")
                            .from(Trip::Table, Trip::DriverId)
                            .to(Driver::Table, Driver::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Trip::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Trip {
    Table,
    Id,
    BookingId,
    PickUp,
    DropOff,
    PickupTime,
    CabId,
    DriverId,
    Status,
    CreatedAt,
    UpdatedAt,
}
