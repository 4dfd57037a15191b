use sea_orm_migration::{prelude::*, schema::*};

use super::m20240601_000005_create_bookings::Booking;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentTransaction::Table)
                    .if_not_exists()
                    .col(uuid(PaymentTransaction::Id).primary_key())
                    .col(uuid(PaymentTransaction::BookingId).not_null())
                    .col(integer(PaymentTransaction::Seq).not_null())
                    .col(string_len(PaymentTransaction::Kind, 30).not_null())
                    .col(big_integer(PaymentTransaction::Amount).not_null())
                    .col(string_len(PaymentTransaction::Method, 20).not_null())
                    .col(string_len(PaymentTransaction::Status, 20).not_null())
                    .col(string_len_null(PaymentTransaction::Reference, 255))
                    .col(text(PaymentTransaction::Notes).not_null())
                    .col(timestamp_with_time_zone(PaymentTransaction::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_transaction_booking")
                            .from(PaymentTransaction::Table, PaymentTransaction::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentTransaction::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PaymentTransaction {
    Table,
    Id,
    BookingId,
    Seq,
    Kind,
    Amount,
    Method,
    Status,
    Reference,
    Notes,
    CreatedAt,
}
