use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum TripStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Confirmed")]
    Confirmed,
    #[sea_orm(string_value = "Assigned")]
    Assigned,
    #[sea_orm(string_value = "InProgress")]
    InProgress,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl TripStatus {
    pub const NON_TERMINAL: [TripStatus; 4] = [
        TripStatus::Pending,
        TripStatus::Confirmed,
        TripStatus::Assigned,
        TripStatus::InProgress,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    /// Next status in the driver-driven progression, `None` once terminal.
    pub fn next(self) -> Option<TripStatus> {
        match self {
            TripStatus::Pending | TripStatus::Confirmed | TripStatus::Assigned => {
                Some(TripStatus::InProgress)
            }
            TripStatus::InProgress => Some(TripStatus::Completed),
            TripStatus::Completed | TripStatus::Cancelled => None,
        }
    }

    /// Whether the trip is still waiting for both a cab and a driver.
    pub fn awaits_assignment(self) -> bool {
        matches!(self, TripStatus::Pending | TripStatus::Confirmed)
    }
}

/// A ground-transport leg tied to a hotel booking.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trip")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub booking_id: Uuid,
    pub pick_up: String,
    pub drop_off: String,
    pub pickup_time: Option<DateTimeWithTimeZone>,
    pub cab_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: TripStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
    #[sea_orm(
        belongs_to = "super::cab::Entity",
        from = "Column::CabId",
        to = "super::cab::Column::Id"
    )]
    Cab,
    #[sea_orm(
        belongs_to = "super::driver::Entity",
        from = "Column::DriverId",
        to = "super::driver::Column::Id"
    )]
    Driver,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl Related<super::cab::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cab.def()
    }
}

impl Related<super::driver::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Driver.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
