use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::booking::PaymentMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(30))")]
pub enum TransactionKind {
    #[sea_orm(string_value = "payment")]
    #[serde(rename = "payment")]
    Payment,
    #[sea_orm(string_value = "cancellation_refund")]
    #[serde(rename = "cancellation_refund")]
    CancellationRefund,
    #[sea_orm(string_value = "early_checkout_refund")]
    #[serde(rename = "early_checkout_refund")]
    EarlyCheckoutRefund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "succeeded")]
    #[serde(rename = "succeeded")]
    Succeeded,
    #[sea_orm(string_value = "failed")]
    #[serde(rename = "failed")]
    Failed,
    /// Recorded locally, still waiting on the gateway or on staff.
    #[sea_orm(string_value = "pending")]
    #[serde(rename = "pending")]
    Pending,
}

/// One entry in a booking's payment history, ordered by `seq`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_transaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub booking_id: Uuid,
    pub seq: i32,
    pub kind: TransactionKind,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub notes: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
