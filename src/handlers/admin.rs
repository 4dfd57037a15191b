use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::driver::{self, DriverStatus};
use crate::entities::user::{self, UserRole};
use crate::entities::cab;
use crate::error::AppResult;
use crate::services::dispatch::ReassignReport;
use crate::services::fleet::{self, DriverSummary, NewCab, NewUser};
use crate::AppState;

// ============ User Management ============

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            created_at: u.created_at.with_timezone(&Utc),
        }
    }
}

/// Create a staff, admin or driver account (admin)
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = fleet::create_user(&state.db, payload, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// List all users (admin)
pub async fn list_all_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = fleet::list_users(&state.db).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Update user role (admin)
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

pub async fn update_user_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    let updated = fleet::update_user_role(
        &state.db,
        state.notifier.as_ref(),
        user_id,
        payload.role,
        Utc::now(),
    )
    .await?;

    Ok(Json(updated.into()))
}

/// Delete any user account (admin)
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    fleet::delete_user(&state.db, state.notifier.as_ref(), id, Utc::now()).await?;
    Ok(Json(serde_json::json!({ "message": "User deleted" })))
}

// ============ Cabs ============

pub async fn create_cab(
    State(state): State<AppState>,
    Json(payload): Json<NewCab>,
) -> AppResult<(StatusCode, Json<cab::Model>)> {
    let cab = fleet::create_cab(&state.db, payload, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(cab)))
}

pub async fn list_cabs(State(state): State<AppState>) -> AppResult<Json<Vec<cab::Model>>> {
    Ok(Json(fleet::list_cabs(&state.db).await?))
}

// ============ Drivers ============

/// List all drivers with their duty status (admin)
pub async fn list_drivers(State(state): State<AppState>) -> AppResult<Json<Vec<DriverSummary>>> {
    Ok(Json(fleet::list_drivers(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct RegisterDriverRequest {
    pub user_id: Uuid,
    pub cab_id: Option<Uuid>,
}

pub async fn register_driver(
    State(state): State<AppState>,
    Json(payload): Json<RegisterDriverRequest>,
) -> AppResult<(StatusCode, Json<driver::Model>)> {
    let driver = fleet::register_driver(&state.db, payload.user_id, payload.cab_id, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(driver)))
}

#[derive(Debug, Deserialize)]
pub struct DriverStatusRequest {
    pub status: DriverStatus,
}

#[derive(Debug, Serialize)]
pub struct DriverStatusResponse {
    pub driver: driver::Model,
    pub reassignment: Option<ReassignReport>,
}

/// Change a driver's duty status; taking them off duty reassigns their trips
pub async fn set_driver_status(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
    Json(payload): Json<DriverStatusRequest>,
) -> AppResult<Json<DriverStatusResponse>> {
    let (driver, reassignment) = fleet::set_driver_status(
        &state.db,
        state.notifier.as_ref(),
        driver_id,
        payload.status,
        Utc::now(),
    )
    .await?;

    Ok(Json(DriverStatusResponse { driver, reassignment }))
}

#[derive(Debug, Deserialize)]
pub struct DriverCabRequest {
    pub cab_id: Option<Uuid>,
}

pub async fn assign_driver_cab(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
    Json(payload): Json<DriverCabRequest>,
) -> AppResult<Json<driver::Model>> {
    let driver = fleet::assign_driver_cab(&state.db, driver_id, payload.cab_id, Utc::now()).await?;
    Ok(Json(driver))
}
