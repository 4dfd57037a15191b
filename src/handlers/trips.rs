use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::trip::{self, TripStatus};
use crate::error::AppResult;
use crate::services::dispatch::{SweepReport, TripAssignment, TripRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TripResponse {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub pick_up: String,
    pub drop_off: String,
    pub pickup_time: Option<DateTime<Utc>>,
    pub cab_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<trip::Model> for TripResponse {
    fn from(t: trip::Model) -> Self {
        Self {
            id: t.id,
            booking_id: t.booking_id,
            pick_up: t.pick_up,
            drop_off: t.drop_off,
            pickup_time: t.pickup_time.map(|p| p.with_timezone(&Utc)),
            cab_id: t.cab_id,
            driver_id: t.driver_id,
            status: t.status,
            created_at: t.created_at.with_timezone(&Utc),
            updated_at: t.updated_at.with_timezone(&Utc),
        }
    }
}

/// Request a pick-up or drop-off for a guest (staff)
pub async fn request_trip(
    State(state): State<AppState>,
    Json(payload): Json<TripRequest>,
) -> AppResult<(StatusCode, Json<TripResponse>)> {
    let trip = state.dispatch().request_trip(payload, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(trip.into())))
}

pub async fn list_trips(State(state): State<AppState>) -> AppResult<Json<Vec<TripResponse>>> {
    let trips = state.dispatch().list_trips().await?;
    Ok(Json(trips.into_iter().map(Into::into).collect()))
}

pub async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<TripResponse>> {
    let trip = state.dispatch().get_trip(trip_id).await?;
    Ok(Json(trip.into()))
}

/// Attach a cab and/or driver; without a driver one is picked automatically
pub async fn assign_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(payload): Json<TripAssignment>,
) -> AppResult<Json<TripResponse>> {
    let trip = state.dispatch().assign_trip(trip_id, payload, Utc::now()).await?;
    Ok(Json(trip.into()))
}

pub async fn cancel_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<TripResponse>> {
    let trip = state.dispatch().cancel_trip(trip_id, Utc::now()).await?;
    Ok(Json(trip.into()))
}

/// Run the driver assignment sweep now instead of waiting for the timer
pub async fn run_dispatch_sweep(State(state): State<AppState>) -> AppResult<Json<SweepReport>> {
    let report = state.dispatch().assign_drivers_to_unassigned(Utc::now()).await?;
    Ok(Json(report))
}
