use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::room::{self, CleanStatus, RoomStatus};
use crate::error::AppResult;
use crate::services::room_status;
use crate::services::rooms::{self, NewRoom};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub id: Uuid,
    pub room_number: String,
    pub room_type: String,
    pub nightly_rate: i64,
    /// What the front desk sees: `Maintenance` while the flag is on.
    pub status: RoomStatus,
    pub projected_status: RoomStatus,
    pub under_maintenance: bool,
    pub clean_status: CleanStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<room::Model> for RoomResponse {
    fn from(r: room::Model) -> Self {
        Self {
            id: r.id,
            status: r.display_status(),
            room_number: r.room_number,
            room_type: r.room_type,
            nightly_rate: r.nightly_rate,
            projected_status: r.status,
            under_maintenance: r.under_maintenance,
            clean_status: r.clean_status,
            updated_at: r.updated_at.with_timezone(&Utc),
        }
    }
}

pub async fn create_room(
    State(state): State<AppState>,
    Json(payload): Json<NewRoom>,
) -> AppResult<(StatusCode, Json<RoomResponse>)> {
    let room = rooms::create_room(&state.db, payload, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(room.into())))
}

pub async fn list_rooms(State(state): State<AppState>) -> AppResult<Json<Vec<RoomResponse>>> {
    let rooms = rooms::list_rooms(&state.db).await?;
    Ok(Json(rooms.into_iter().map(Into::into).collect()))
}

pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<RoomResponse>> {
    let room = rooms::get_room(&state.db, room_id).await?;
    Ok(Json(room.into()))
}

#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    pub under_maintenance: bool,
}

pub async fn set_maintenance(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<MaintenanceRequest>,
) -> AppResult<Json<RoomResponse>> {
    let room = rooms::set_maintenance(&state.db, room_id, payload.under_maintenance, Utc::now()).await?;
    Ok(Json(room.into()))
}

#[derive(Debug, Deserialize)]
pub struct CleanStatusRequest {
    pub clean_status: CleanStatus,
}

pub async fn set_clean_status(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<CleanStatusRequest>,
) -> AppResult<Json<RoomResponse>> {
    let room = rooms::set_clean_status(&state.db, room_id, payload.clean_status, Utc::now()).await?;
    Ok(Json(room.into()))
}

/// Recompute one room's status from its bookings
pub async fn refresh_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<RoomResponse>> {
    let room = rooms::refresh_room(&state.db, room_id, Utc::now(), state.config.hotel_offset()).await?;
    Ok(Json(room.into()))
}

/// Recompute every room (the same pass the background sweep runs)
pub async fn refresh_all_rooms(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let changed = room_status::refresh_all(&state.db, Utc::now(), state.config.hotel_offset()).await?;
    Ok(Json(serde_json::json!({ "changed": changed })))
}
