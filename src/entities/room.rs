use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Display status of a room.
///
/// The stored column only ever holds the projected values (`Available`,
/// `Reserved`, `Occupied`). `Maintenance` is surfaced from the separate
/// `under_maintenance` flag by [`Model::display_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum RoomStatus {
    #[sea_orm(string_value = "Available")]
    Available,
    #[sea_orm(string_value = "Occupied")]
    Occupied,
    #[sea_orm(string_value = "Reserved")]
    Reserved,
    #[sea_orm(string_value = "Maintenance")]
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum CleanStatus {
    #[sea_orm(string_value = "Dirty")]
    Dirty,
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "In-Progress")]
    #[serde(rename = "In-Progress")]
    InProgress,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Clean")]
    Clean,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "room")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub room_number: String,
    pub room_type: String,
    pub nightly_rate: i64,
    pub status: RoomStatus,
    pub under_maintenance: bool,
    pub clean_status: CleanStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn display_status(&self) -> RoomStatus {
        if self.under_maintenance {
            RoomStatus::Maintenance
        } else {
            self.status
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
