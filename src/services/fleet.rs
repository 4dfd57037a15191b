//! Staff accounts, drivers and cabs.
//!
//! A user with role `Driver` always has a matching `driver` row. Taking a
//! driver off the road (status change, role change or deletion) hands their
//! open trips to other drivers first.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::cab;
use crate::entities::driver::{self, DriverStatus};
use crate::entities::trip::{self, TripStatus};
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::services::dispatch::{DispatchEngine, ReassignReport};
use crate::services::notify::Notifier;

// ============ Cabs ============

#[derive(Debug, Clone, Deserialize)]
pub struct NewCab {
    pub registration: String,
    pub model: String,
    pub capacity: i32,
}

pub async fn create_cab(db: &DatabaseConnection, input: NewCab, now: DateTime<Utc>) -> AppResult<cab::Model> {
    let registration = input.registration.trim().to_uppercase();
    if registration.is_empty() {
        return Err(AppError::Validation("Registration is required".to_string()));
    }
    if input.capacity < 1 {
        return Err(AppError::Validation("Capacity must be positive".to_string()));
    }

    let existing = cab::Entity::find()
        .filter(cab::Column::Registration.eq(registration.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict(format!("Cab {} already exists", registration)));
    }

    let new_cab = cab::ActiveModel {
        id: Set(Uuid::new_v4()),
        registration: Set(registration),
        model: Set(input.model.trim().to_string()),
        capacity: Set(input.capacity),
        created_at: Set(now.into()),
    };

    let cab = new_cab.insert(db).await?;
    tracing::info!(cab_id = %cab.id, registration = %cab.registration, "Cab registered");

    Ok(cab)
}

pub async fn list_cabs(db: &DatabaseConnection) -> AppResult<Vec<cab::Model>> {
    Ok(cab::Entity::find()
        .order_by_asc(cab::Column::Registration)
        .all(db)
        .await?)
}

// ============ Users ============

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

pub async fn create_user(db: &DatabaseConnection, input: NewUser, now: DateTime<Utc>) -> AppResult<user::Model> {
    let email = input.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict("Email already registered"));
    }

    let txn = db.begin().await?;

    let new_user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        name: Set(input.name.trim().to_string()),
        role: Set(input.role),
        created_at: Set(now.into()),
    };
    let user = new_user.insert(&txn).await?;

    if user.role == UserRole::Driver {
        insert_driver(&txn, user.id, now).await?;
    }

    txn.commit().await?;
    tracing::info!(user_id = %user.id, role = ?user.role, "User created");

    Ok(user)
}

async fn insert_driver<C: ConnectionTrait>(conn: &C, user_id: Uuid, now: DateTime<Utc>) -> AppResult<driver::Model> {
    let new_driver = driver::ActiveModel {
        id: Set(user_id),
        status: Set(DriverStatus::Available),
        cab_id: Set(None),
        updated_at: Set(now.into()),
    };
    Ok(new_driver.insert(conn).await?)
}

pub async fn list_users(db: &DatabaseConnection) -> AppResult<Vec<user::Model>> {
    Ok(user::Entity::find()
        .order_by_asc(user::Column::Email)
        .all(db)
        .await?)
}

/// Change a user's role. Leaving the driver role hands the user's open trips
/// to other drivers and drops the driver record; gaining it creates one.
pub async fn update_user_role(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    user_id: Uuid,
    role: UserRole,
    now: DateTime<Utc>,
) -> AppResult<user::Model> {
    let user = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let old_role = user.role.clone();
    if old_role == role {
        return Ok(user);
    }

    if old_role == UserRole::Driver {
        let report = DispatchEngine::new(db, notifier)
            .reassign_trips_for_driver(user_id, now)
            .await?;
        tracing::info!(
            user_id = %user_id,
            reassigned = report.reassigned,
            cleared = report.cleared,
            "Driver role removed"
        );
    }

    let txn = db.begin().await?;

    if old_role == UserRole::Driver {
        driver::Entity::delete_by_id(user_id).exec(&txn).await?;
    }
    if role == UserRole::Driver {
        insert_driver(&txn, user_id, now).await?;
    }

    let mut active: user::ActiveModel = user.into();
    active.role = Set(role);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    tracing::info!(user_id = %updated.id, from = ?old_role, to = ?updated.role, "User role updated");

    Ok(updated)
}

pub async fn delete_user(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let user = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.role == UserRole::Driver {
        // Keep the driver out of the candidate pool while their trips move
        driver::Entity::update_many()
            .col_expr(driver::Column::Status, Expr::value(DriverStatus::Unavailable))
            .filter(driver::Column::Id.eq(user_id))
            .exec(db)
            .await?;

        DispatchEngine::new(db, notifier)
            .reassign_trips_for_driver(user_id, now)
            .await?;
    }

    let txn = db.begin().await?;
    driver::Entity::delete_by_id(user_id).exec(&txn).await?;
    user::Entity::delete_by_id(user_id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = %user_id, role = ?user.role, "User deleted");
    Ok(())
}

// ============ Drivers ============

#[derive(Debug, Clone, Serialize)]
pub struct DriverSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: DriverStatus,
    pub cab_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

pub async fn list_drivers(db: &DatabaseConnection) -> AppResult<Vec<DriverSummary>> {
    let rows = driver::Entity::find()
        .find_also_related(user::Entity)
        .order_by_asc(driver::Column::UpdatedAt)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(d, u)| DriverSummary {
            id: d.id,
            name: u.as_ref().map(|u| u.name.clone()).unwrap_or_default(),
            email: u.map(|u| u.email).unwrap_or_default(),
            status: d.status,
            cab_id: d.cab_id,
            updated_at: d.updated_at.with_timezone(&Utc),
        })
        .collect())
}

pub async fn get_driver(db: &DatabaseConnection, driver_id: Uuid) -> AppResult<driver::Model> {
    driver::Entity::find_by_id(driver_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))
}

/// Create the driver record for an existing user with the `Driver` role.
pub async fn register_driver(
    db: &DatabaseConnection,
    user_id: Uuid,
    cab_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> AppResult<driver::Model> {
    let user = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.role != UserRole::Driver {
        return Err(AppError::Validation("User is not a driver".to_string()));
    }
    if driver::Entity::find_by_id(user_id).one(db).await?.is_some() {
        return Err(AppError::conflict("Driver is already registered"));
    }

    insert_driver(db, user_id, now).await?;
    assign_driver_cab(db, user_id, cab_id, now).await
}

/// Set a driver's duty status. `onTrip` is owned by trip assignment and
/// cannot be set by hand, and a driver still holding an open trip cannot be
/// made `Available`. Withdrawing a driver reassigns their open trips.
pub async fn set_driver_status(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    driver_id: Uuid,
    status: DriverStatus,
    now: DateTime<Utc>,
) -> AppResult<(driver::Model, Option<ReassignReport>)> {
    if status == DriverStatus::OnTrip {
        return Err(AppError::Validation(
            "onTrip is set automatically when a trip is assigned".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let current = driver::Entity::find_by_id(driver_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;
    let previous = current.status;

    if status == DriverStatus::Available {
        let open = trip::Entity::find()
            .filter(trip::Column::DriverId.eq(driver_id))
            .filter(trip::Column::Status.is_in(TripStatus::NON_TERMINAL))
            .count(&txn)
            .await?;
        if open > 0 {
            return Err(AppError::InvalidStateTransition(format!(
                "Driver still holds {} open trip(s)",
                open
            )));
        }
    }

    let mut active: driver::ActiveModel = current.into();
    active.status = Set(status);
    active.updated_at = Set(now.into());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(driver_id = %driver_id, from = ?previous, to = ?status, "Driver status changed");

    let report = if status.withdraws_driver() {
        Some(
            DispatchEngine::new(db, notifier)
                .reassign_trips_for_driver(driver_id, now)
                .await?,
        )
    } else {
        None
    };

    Ok((updated, report))
}

/// Attach a driver to a cab, or detach with `None`.
pub async fn assign_driver_cab(
    db: &DatabaseConnection,
    driver_id: Uuid,
    cab_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> AppResult<driver::Model> {
    let current = get_driver(db, driver_id).await?;

    if let Some(cab_id) = cab_id {
        cab::Entity::find_by_id(cab_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Cab not found".to_string()))?;
    }

    let mut active: driver::ActiveModel = current.into();
    active.cab_id = Set(cab_id);
    active.updated_at = Set(now.into());

    Ok(active.update(db).await?)
}
