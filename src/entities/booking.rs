use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum BookingStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Confirmed")]
    Confirmed,
    #[sea_orm(string_value = "CheckedIn")]
    CheckedIn,
    #[sea_orm(string_value = "CheckedOut")]
    CheckedOut,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
    #[sea_orm(string_value = "NoShow")]
    NoShow,
}

impl BookingStatus {
    /// Statuses that hold the room against double-booking.
    pub const ACTIVE: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::CheckedIn,
    ];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Whether a caller may move a booking from `self` to `next`.
    /// Re-asserting the current status is always allowed.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;

        if self == next {
            return true;
        }

        match (self, next) {
            (Pending, Confirmed) | (Confirmed, CheckedIn) | (CheckedIn, CheckedOut) => true,
            (Pending | Confirmed, NoShow) => true,
            (from, Cancelled) => from.is_active(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Paid")]
    Paid,
    #[sea_orm(string_value = "Partial")]
    Partial,
    #[sea_orm(string_value = "Refunded")]
    Refunded,
}

impl PaymentStatus {
    /// Status implied by how much of `total` has been collected.
    pub fn from_collected(collected: i64, total: i64) -> Self {
        if collected <= 0 {
            PaymentStatus::Pending
        } else if collected < total {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Paid
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    #[serde(rename = "cash")]
    Cash,
    #[sea_orm(string_value = "card")]
    #[serde(rename = "card")]
    Card,
    #[sea_orm(string_value = "bank_transfer")]
    #[serde(rename = "bank_transfer")]
    BankTransfer,
}

impl PaymentMethod {
    /// Methods settled through the external payment gateway.
    pub fn is_gateway_mediated(self) -> bool {
        matches!(self, PaymentMethod::Card | PaymentMethod::BankTransfer)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub room_id: Uuid,
    pub room_number: String,
    pub status: BookingStatus,
    pub guest_name: String,
    pub guest_phone: String,
    pub guest_country_code: String,
    pub guest_email: Option<String>,
    pub check_in: DateTimeWithTimeZone,
    pub check_out: DateTimeWithTimeZone,
    pub adults: i32,
    pub children: i32,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub total_amount: i64,
    pub refunded_amount: i64,
    pub external_payment_ref: Option<String>,
    pub check_in_time: Option<DateTimeWithTimeZone>,
    pub check_out_time: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id"
    )]
    Room,
    #[sea_orm(has_many = "super::payment_transaction::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::trip::Entity")]
    Trips,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl Related<super::payment_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::trip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn test_forward_progression() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(CheckedIn));
        assert!(CheckedIn.can_transition_to(CheckedOut));
        assert!(!Pending.can_transition_to(CheckedOut));
        assert!(!CheckedOut.can_transition_to(CheckedIn));
    }

    #[test]
    fn test_cancel_and_no_show_sources() {
        for from in BookingStatus::ACTIVE {
            assert!(from.can_transition_to(Cancelled));
        }
        assert!(!CheckedOut.can_transition_to(Cancelled));
        assert!(!NoShow.can_transition_to(Cancelled));

        assert!(Pending.can_transition_to(NoShow));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(!CheckedIn.can_transition_to(NoShow));
    }

    #[test]
    fn test_same_status_is_allowed() {
        assert!(CheckedOut.can_transition_to(CheckedOut));
        assert!(Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn test_payment_status_from_collected() {
        assert_eq!(PaymentStatus::from_collected(0, 100), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_collected(40, 100), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::from_collected(100, 100), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_collected(0, 0), PaymentStatus::Pending);
    }

    #[test]
    fn test_gateway_mediated_methods() {
        assert!(PaymentMethod::Card.is_gateway_mediated());
        assert!(PaymentMethod::BankTransfer.is_gateway_mediated());
        assert!(!PaymentMethod::Cash.is_gateway_mediated());
    }
}
