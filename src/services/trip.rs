//! Trip progression driven by the assigned driver.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::trip::{self, TripStatus};
use crate::error::{AppError, AppResult};
use crate::services::dispatch::{lock_trip, release_driver};

/// Authorization and state checks for advancing `trip` on behalf of
/// `caller`. Returns the status to move to.
pub fn next_status_for(trip: &trip::Model, caller: Uuid) -> AppResult<TripStatus> {
    if trip.driver_id != Some(caller) {
        return Err(AppError::Forbidden(
            "You are not assigned to this trip".to_string(),
        ));
    }

    trip.status.next().ok_or_else(|| {
        AppError::InvalidStateTransition(format!("Trip is already {:?}", trip.status))
    })
}

/// Move a trip one step along `Pending|Confirmed|Assigned -> InProgress ->
/// Completed`. Completing a trip frees its driver. The identity check runs
/// against the locked row, so a trip reassigned away from `caller` cannot be
/// advanced by them.
pub async fn advance_trip(
    db: &DatabaseConnection,
    trip_id: Uuid,
    caller: Uuid,
    now: DateTime<Utc>,
) -> AppResult<trip::Model> {
    let txn = db.begin().await?;

    let current = lock_trip(&txn, trip_id).await?;
    let next = next_status_for(&current, caller)?;
    let from = current.status;

    let mut active: trip::ActiveModel = current.into();
    active.status = Set(next);
    active.updated_at = Set(now.into());
    let trip = active.update(&txn).await?;

    if next == TripStatus::Completed {
        release_driver(&txn, caller, now).await?;
    }

    txn.commit().await?;

    tracing::info!(
        trip_id = %trip.id,
        driver_id = %caller,
        from = ?from,
        to = ?next,
        "Trip advanced"
    );

    Ok(trip)
}

/// Trips currently or previously assigned to a driver, newest first.
pub async fn list_driver_trips(db: &DatabaseConnection, driver_id: Uuid) -> AppResult<Vec<trip::Model>> {
    Ok(trip::Entity::find()
        .filter(trip::Column::DriverId.eq(driver_id))
        .order_by_desc(trip::Column::CreatedAt)
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(status: TripStatus, driver_id: Option<Uuid>) -> trip::Model {
        let now = Utc::now().fixed_offset();
        trip::Model {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            pick_up: "Lobby".to_string(),
            drop_off: "Airport".to_string(),
            pickup_time: None,
            cab_id: None,
            driver_id,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_assigned_driver_advances() {
        let driver = Uuid::new_v4();
        let t = trip(TripStatus::Assigned, Some(driver));
        assert_eq!(next_status_for(&t, driver).unwrap(), TripStatus::InProgress);
    }

    #[test]
    fn test_other_driver_is_forbidden() {
        let t = trip(TripStatus::Assigned, Some(Uuid::new_v4()));
        let err = next_status_for(&t, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_unassigned_trip_is_forbidden() {
        let t = trip(TripStatus::Pending, None);
        assert!(matches!(
            next_status_for(&t, Uuid::new_v4()),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_cancelled_trip_cannot_advance() {
        let driver = Uuid::new_v4();
        let t = trip(TripStatus::Cancelled, Some(driver));
        assert!(matches!(
            next_status_for(&t, driver),
            Err(AppError::InvalidStateTransition(_))
        ));
    }
}
