//! Room inventory and housekeeping.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::room::{self, CleanStatus, RoomStatus};
use crate::error::{AppError, AppResult};
use crate::services::room_status;

#[derive(Debug, Clone, Deserialize)]
pub struct NewRoom {
    pub room_number: String,
    pub room_type: String,
    pub nightly_rate: i64,
}

pub async fn create_room(db: &DatabaseConnection, input: NewRoom, now: DateTime<Utc>) -> AppResult<room::Model> {
    let room_number = input.room_number.trim().to_string();
    if room_number.is_empty() || input.room_type.trim().is_empty() {
        return Err(AppError::Validation(
            "Room number and room type are required".to_string(),
        ));
    }
    if input.nightly_rate < 0 {
        return Err(AppError::Validation("Nightly rate cannot be negative".to_string()));
    }

    let existing = room::Entity::find()
        .filter(room::Column::RoomNumber.eq(room_number.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict(format!("Room {} already exists", room_number)));
    }

    let new_room = room::ActiveModel {
        id: Set(Uuid::new_v4()),
        room_number: Set(room_number),
        room_type: Set(input.room_type.trim().to_string()),
        nightly_rate: Set(input.nightly_rate),
        status: Set(RoomStatus::Available),
        under_maintenance: Set(false),
        clean_status: Set(CleanStatus::Clean),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let room = new_room.insert(db).await?;
    tracing::info!(room_id = %room.id, room_number = %room.room_number, "Room created");

    Ok(room)
}

pub async fn list_rooms(db: &DatabaseConnection) -> AppResult<Vec<room::Model>> {
    Ok(room::Entity::find()
        .order_by_asc(room::Column::RoomNumber)
        .all(db)
        .await?)
}

pub async fn get_room(db: &DatabaseConnection, room_id: Uuid) -> AppResult<room::Model> {
    room::Entity::find_by_id(room_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))
}

/// Take a room out of service or put it back. Reservations are untouched and
/// the projected status keeps being maintained underneath the flag.
pub async fn set_maintenance(
    db: &DatabaseConnection,
    room_id: Uuid,
    under_maintenance: bool,
    now: DateTime<Utc>,
) -> AppResult<room::Model> {
    let room = get_room(db, room_id).await?;
    if room.under_maintenance == under_maintenance {
        return Ok(room);
    }

    let mut active: room::ActiveModel = room.into();
    active.under_maintenance = Set(under_maintenance);
    active.updated_at = Set(now.into());
    let room = active.update(db).await?;

    tracing::info!(room_id = %room.id, under_maintenance, "Room maintenance flag changed");
    Ok(room)
}

pub async fn set_clean_status(
    db: &DatabaseConnection,
    room_id: Uuid,
    clean_status: CleanStatus,
    now: DateTime<Utc>,
) -> AppResult<room::Model> {
    let room = get_room(db, room_id).await?;

    let mut active: room::ActiveModel = room.into();
    active.clean_status = Set(clean_status);
    active.updated_at = Set(now.into());
    let room = active.update(db).await?;

    tracing::debug!(room_id = %room.id, clean_status = ?room.clean_status, "Housekeeping status updated");
    Ok(room)
}

/// Recompute a single room's status on demand and return the fresh row.
pub async fn refresh_room(
    db: &DatabaseConnection,
    room_id: Uuid,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> AppResult<room::Model> {
    room_status::refresh(db, room_id, now, offset).await?;
    get_room(db, room_id).await
}
