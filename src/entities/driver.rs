use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum DriverStatus {
    #[sea_orm(string_value = "Available")]
    Available,
    #[sea_orm(string_value = "Unavailable")]
    Unavailable,
    #[sea_orm(string_value = "Leave")]
    Leave,
    #[sea_orm(string_value = "onTrip")]
    #[serde(rename = "onTrip")]
    OnTrip,
}

impl DriverStatus {
    /// Statuses that take a driver off the road and force their trips to be
    /// handed to someone else.
    pub fn withdraws_driver(self) -> bool {
        matches!(self, DriverStatus::Unavailable | DriverStatus::Leave)
    }
}

/// Driver record. The primary key is the id of the `user` whose role is
/// `Driver`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "driver")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub status: DriverStatus,
    pub cab_id: Option<Uuid>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::Id",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::cab::Entity",
        from = "Column::CabId",
        to = "super::cab::Column::Id"
    )]
    Cab,
    #[sea_orm(has_many = "super::trip::Entity")]
    Trips,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::cab::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cab.def()
    }
}

impl Related<super::trip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
