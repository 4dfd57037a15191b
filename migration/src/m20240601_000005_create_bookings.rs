use sea_orm_migration::{prelude::*, schema::*};

use super::m20240601_000001_create_rooms::Room;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(uuid(Booking::RoomId).not_null())
                    .col(string_len(Booking::RoomNumber, 20).not_null())
                    .col(string_len(Booking::Status, 20).not_null())
                    .col(string_len(Booking::GuestName, 100).not_null())
                    .col(string_len(Booking::GuestPhone, 30).not_null())
                    .col(string_len(Booking::GuestCountryCode, 8).not_null())
                    .col(string_len_null(Booking::GuestEmail, 255))
                    .col(timestamp_with_time_zone(Booking::CheckIn).not_null())
                    .col(timestamp_with_time_zone(Booking::CheckOut).not_null())
                    .col(integer(Booking::Adults).not_null())
                    .col(integer(Booking::Children).not_null())
                    .col(string_len(Booking::PaymentStatus, 20).not_null())
                    .col(string_len(Booking::PaymentMethod, 20).not_null())
                    .col(big_integer(Booking::TotalAmount).not_null())
                    .col(big_integer(Booking::RefundedAmount).not_null())
                    .col(string_len_null(Booking::ExternalPaymentRef, 255))
                    .col(timestamp_with_time_zone_null(Booking::CheckInTime))
                    .col(timestamp_with_time_zone_null(Booking::CheckOutTime))
                    .col(timestamp_with_time_zone(Booking::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Booking::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_room")
                            .from(Booking::Table, Booking::RoomId)
                            .to(Room::Table, Room::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Overlap checks scan a room's bookings by status
        manager
            .create_index(
                Index::create()
                    .name("idx_booking_room_status")
                    .table(Booking::Table)
                    .col(Booking::RoomId)
                    .col(Booking::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    RoomId,
    RoomNumber,
    Status,
    GuestName,
    GuestPhone,
    GuestCountryCode,
    GuestEmail,
    CheckIn,
    CheckOut,
    Adults,
    Children,
    PaymentStatus,
    PaymentMethod,
    TotalAmount,
    RefundedAmount,
    ExternalPaymentRef,
    CheckInTime,
    CheckOutTime,
    CreatedAt,
    UpdatedAt,
}
