//! Driver assignment engine.
//!
//! Selecting a driver and claiming them is a single conditional update
//! (`Available -> onTrip`), so two concurrent trip requests can never both
//! take the same driver. A lost race excludes that driver and searches again.
//!
//! Writers to an existing trip lock the trip row first and the driver rows
//! after it, and decide from the locked row only.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::driver::{self, DriverStatus};
use crate::entities::trip::{self, TripStatus};
use crate::entities::user::{self, UserRole};
use crate::entities::cab;
use crate::error::{AppError, AppResult};
use crate::services::notify::Notifier;

/// Search criteria for [`find_available_driver`].
#[derive(Debug, Clone, Default)]
pub struct DriverQuery {
    pub preferred_cab_id: Option<Uuid>,
    pub exclude: Vec<Uuid>,
}

/// Least-recently-updated available driver, preferring one attached to
/// `preferred_cab_id` when given.
pub async fn find_available_driver<C: ConnectionTrait>(
    conn: &C,
    query: &DriverQuery,
) -> AppResult<Option<driver::Model>> {
    let base = || {
        let mut select = driver::Entity::find()
            .join(sea_orm::JoinType::InnerJoin, driver::Relation::User.def())
            .filter(user::Column::Role.eq(UserRole::Driver))
            .filter(driver::Column::Status.eq(DriverStatus::Available))
            .order_by_asc(driver::Column::UpdatedAt);
        if !query.exclude.is_empty() {
            select = select.filter(driver::Column::Id.is_not_in(query.exclude.clone()));
        }
        select
    };

    if let Some(cab_id) = query.preferred_cab_id {
        let on_cab = base()
            .filter(driver::Column::CabId.eq(cab_id))
            .one(conn)
            .await?;
        if on_cab.is_some() {
            return Ok(on_cab);
        }
    }

    Ok(base().one(conn).await?)
}

/// Atomically move a driver from `Available` to `onTrip`.
/// Returns `false` if the driver was no longer available.
pub async fn claim_driver<C: ConnectionTrait>(
    conn: &C,
    driver_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = driver::Entity::update_many()
        .col_expr(driver::Column::Status, Expr::value(DriverStatus::OnTrip))
        .col_expr(driver::Column::UpdatedAt, Expr::value(now.fixed_offset()))
        .filter(driver::Column::Id.eq(driver_id))
        .filter(driver::Column::Status.eq(DriverStatus::Available))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Find and claim a driver in one step, retrying past drivers lost to a
/// concurrent claim.
pub async fn claim_available_driver<C: ConnectionTrait>(
    conn: &C,
    mut query: DriverQuery,
    now: DateTime<Utc>,
) -> AppResult<Option<driver::Model>> {
    loop {
        let Some(candidate) = find_available_driver(conn, &query).await? else {
            return Ok(None);
        };

        if claim_driver(conn, candidate.id, now).await? {
            return Ok(Some(driver::Model {
                status: DriverStatus::OnTrip,
                updated_at: now.fixed_offset(),
                ..candidate
            }));
        }

        tracing::debug!(driver_id = %candidate.id, "Driver claimed concurrently, retrying");
        query.exclude.push(candidate.id);
    }
}

/// Return an `onTrip` driver to `Available`. Drivers whose status was set
/// by an administrator in the meantime are left alone.
pub async fn release_driver<C: ConnectionTrait>(
    conn: &C,
    driver_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    driver::Entity::update_many()
        .col_expr(driver::Column::Status, Expr::value(DriverStatus::Available))
        .col_expr(driver::Column::UpdatedAt, Expr::value(now.fixed_offset()))
        .filter(driver::Column::Id.eq(driver_id))
        .filter(driver::Column::Status.eq(DriverStatus::OnTrip))
        .exec(conn)
        .await?;

    Ok(())
}

/// Load a trip and hold its row lock for the rest of the transaction. Every
/// read that decides a trip write goes through here, so the decision and the
/// write see the same driver and status.
pub async fn lock_trip<C: ConnectionTrait>(conn: &C, trip_id: Uuid) -> AppResult<trip::Model> {
    trip::Entity::find_by_id(trip_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))
}

/// Cancel every non-terminal trip of a booking and free their drivers.
pub async fn cancel_trips_for_booking<C: ConnectionTrait>(
    conn: &C,
    booking_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<usize> {
    let trips = trip::Entity::find()
        .filter(trip::Column::BookingId.eq(booking_id))
        .filter(trip::Column::Status.is_in(TripStatus::NON_TERMINAL))
        .lock_exclusive()
        .all(conn)
        .await?;

    let count = trips.len();
    for t in trips {
        if let Some(driver_id) = t.driver_id {
            release_driver(conn, driver_id, now).await?;
        }
        let mut active: trip::ActiveModel = t.into();
        active.status = Set(TripStatus::Cancelled);
        active.updated_at = Set(now.into());
        active.update(conn).await?;
    }

    Ok(count)
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripRequest {
    pub booking_id: Uuid,
    pub pick_up: String,
    pub drop_off: String,
    pub pickup_time: Option<DateTime<Utc>>,
    pub cab_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripAssignment {
    pub cab_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub total: usize,
    pub assigned: usize,
    pub unassigned: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReassignReport {
    pub reassigned: usize,
    pub cleared: usize,
}

pub struct DispatchEngine<'a> {
    db: &'a DatabaseConnection,
    notifier: &'a dyn Notifier,
}

impl<'a> DispatchEngine<'a> {
    pub fn new(db: &'a DatabaseConnection, notifier: &'a dyn Notifier) -> Self {
        Self { db, notifier }
    }

    fn notify_assigned(&self, trip: &trip::Model) {
        if let Some(driver_id) = trip.driver_id {
            self.notifier.notify_user(
                driver_id,
                "trip.assigned",
                json!({
                    "tripId": trip.id,
                    "bookingId": trip.booking_id,
                    "pickUp": trip.pick_up,
                    "dropOff": trip.drop_off,
                    "cabId": trip.cab_id,
                }),
            );
        }
    }

    pub async fn get_trip(&self, trip_id: Uuid) -> AppResult<trip::Model> {
        trip::Entity::find_by_id(trip_id)
            .one(self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))
    }

    pub async fn list_trips(&self) -> AppResult<Vec<trip::Model>> {
        Ok(trip::Entity::find()
            .order_by_desc(trip::Column::CreatedAt)
            .all(self.db)
            .await?)
    }

    /// Create a trip for a booking. If a cab is requested, a driver is
    /// claimed for it when one is free; otherwise the trip waits `Pending`.
    pub async fn request_trip(&self, request: TripRequest, now: DateTime<Utc>) -> AppResult<trip::Model> {
        if request.pick_up.trim().is_empty() || request.drop_off.trim().is_empty() {
            return Err(AppError::Validation(
                "Pick-up and drop-off locations are required".to_string(),
            ));
        }

        let booking = booking::Entity::find_by_id(request.booking_id)
            .one(self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if matches!(booking.status, BookingStatus::Cancelled | BookingStatus::NoShow) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot request a trip for a {:?} booking",
                booking.status
            )));
        }

        if let Some(cab_id) = request.cab_id {
            ensure_cab_exists(self.db, cab_id).await?;
        }

        let txn = self.db.begin().await?;

        let driver = match request.cab_id {
            Some(cab_id) => {
                let query = DriverQuery {
                    preferred_cab_id: Some(cab_id),
                    exclude: Vec::new(),
                };
                claim_available_driver(&txn, query, now).await?
            }
            None => None,
        };

        let status = if request.cab_id.is_some() && driver.is_some() {
            TripStatus::Assigned
        } else {
            TripStatus::Pending
        };

        let new_trip = trip::ActiveModel {
            id: Set(Uuid::new_v4()),
            booking_id: Set(booking.id),
            pick_up: Set(request.pick_up.trim().to_string()),
            drop_off: Set(request.drop_off.trim().to_string()),
            pickup_time: Set(request.pickup_time.map(Into::into)),
            cab_id: Set(request.cab_id),
            driver_id: Set(driver.as_ref().map(|d| d.id)),
            status: Set(status),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let trip = new_trip.insert(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            trip_id = %trip.id,
            booking_id = %trip.booking_id,
            driver_id = ?trip.driver_id,
            status = ?trip.status,
            "Trip requested"
        );
        self.notify_assigned(&trip);

        Ok(trip)
    }

    /// Attach a cab and/or driver to a trip. Without an explicit driver one
    /// is selected automatically; none free is `NoAvailableDriver`.
    pub async fn assign_trip(
        &self,
        trip_id: Uuid,
        assignment: TripAssignment,
        now: DateTime<Utc>,
    ) -> AppResult<trip::Model> {
        if let Some(cab_id) = assignment.cab_id {
            ensure_cab_exists(self.db, cab_id).await?;
        }

        let txn = self.db.begin().await?;

        let current = lock_trip(&txn, trip_id).await?;
        if current.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "Trip is already {:?}",
                current.status
            )));
        }

        let mut cab_id = assignment.cab_id.or(current.cab_id);

        let driver = match assignment.driver_id {
            Some(driver_id) if Some(driver_id) == current.driver_id => None,
            Some(driver_id) => {
                let requested = driver::Entity::find_by_id(driver_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;

                if !claim_driver(&txn, driver_id, now).await? {
                    return Err(AppError::NoAvailableDriver(
                        "Requested driver is not available".to_string(),
                    ));
                }
                Some(requested)
            }
            None if current.driver_id.is_some() => None,
            None => {
                let query = DriverQuery {
                    preferred_cab_id: cab_id,
                    exclude: Vec::new(),
                };
                let found = claim_available_driver(&txn, query, now).await?;
                if found.is_none() {
                    return Err(AppError::NoAvailableDriver(
                        "No driver is available for this trip".to_string(),
                    ));
                }
                found
            }
        };

        let mut active: trip::ActiveModel = current.clone().into();

        if let Some(new_driver) = &driver {
            if let Some(previous) = current.driver_id {
                release_driver(&txn, previous, now).await?;
            }
            if cab_id.is_none() {
                cab_id = new_driver.cab_id;
            }
            active.driver_id = Set(Some(new_driver.id));
        }

        let driver_id = driver.as_ref().map(|d| d.id).or(current.driver_id);
        active.cab_id = Set(cab_id);
        if cab_id.is_some() && driver_id.is_some() && current.status.awaits_assignment() {
            active.status = Set(TripStatus::Assigned);
        }
        active.updated_at = Set(now.into());

        let trip = active.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            trip_id = %trip.id,
            driver_id = ?trip.driver_id,
            cab_id = ?trip.cab_id,
            status = ?trip.status,
            "Trip assignment updated"
        );
        if driver.is_some() {
            self.notify_assigned(&trip);
        }

        Ok(trip)
    }

    pub async fn cancel_trip(&self, trip_id: Uuid, now: DateTime<Utc>) -> AppResult<trip::Model> {
        let txn = self.db.begin().await?;

        let current = lock_trip(&txn, trip_id).await?;
        if current.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "Trip is already {:?}",
                current.status
            )));
        }

        if let Some(driver_id) = current.driver_id {
            release_driver(&txn, driver_id, now).await?;
        }

        let mut active: trip::ActiveModel = current.into();
        active.status = Set(TripStatus::Cancelled);
        active.updated_at = Set(now.into());
        let trip = active.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(trip_id = %trip.id, "Trip cancelled");
        if let Some(driver_id) = trip.driver_id {
            self.notifier
                .notify_user(driver_id, "trip.cancelled", json!({ "tripId": trip.id }));
        }

        Ok(trip)
    }

    /// Hand every open trip of a withdrawn driver to another driver, keeping
    /// the same cab where possible. Trips nobody can take lose their driver
    /// but keep their status.
    pub async fn reassign_trips_for_driver(
        &self,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<ReassignReport> {
        let trips = trip::Entity::find()
            .filter(trip::Column::DriverId.eq(driver_id))
            .filter(trip::Column::Status.is_in(TripStatus::NON_TERMINAL))
            .all(self.db)
            .await?;

        let mut report = ReassignReport::default();

        for t in trips {
            let txn = self.db.begin().await?;

            // Trip row before driver rows, the same order every trip writer uses
            let t = lock_trip(&txn, t.id).await?;
            if t.driver_id != Some(driver_id) || t.status.is_terminal() {
                txn.rollback().await?;
                continue;
            }

            let query = DriverQuery {
                preferred_cab_id: t.cab_id,
                exclude: vec![driver_id],
            };
            let replacement = claim_available_driver(&txn, query, now).await?;
            let new_driver_id = replacement.as_ref().map(|d| d.id);

            trip::Entity::update_many()
                .col_expr(trip::Column::DriverId, Expr::value(new_driver_id))
                .col_expr(trip::Column::UpdatedAt, Expr::value(now.fixed_offset()))
                .filter(trip::Column::Id.eq(t.id))
                .exec(&txn)
                .await?;
            txn.commit().await?;

            match new_driver_id {
                Some(new_id) => {
                    report.reassigned += 1;
                    tracing::info!(
                        trip_id = %t.id,
                        from_driver = %driver_id,
                        to_driver = %new_id,
                        "Trip reassigned"
                    );
                    self.notify_assigned(&trip::Model {
                        driver_id: Some(new_id),
                        ..t
                    });
                }
                None => {
                    report.cleared += 1;
                    tracing::warn!(
                        trip_id = %t.id,
                        from_driver = %driver_id,
                        "No replacement driver, trip left unassigned"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Reconciliation sweep: give a driver to every open trip that has a cab
    /// but no driver.
    pub async fn assign_drivers_to_unassigned(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let trips = trip::Entity::find()
            .filter(trip::Column::Status.is_in(TripStatus::NON_TERMINAL))
            .filter(trip::Column::CabId.is_not_null())
            .filter(trip::Column::DriverId.is_null())
            .order_by_asc(trip::Column::CreatedAt)
            .all(self.db)
            .await?;

        let mut report = SweepReport {
            total: trips.len(),
            ..Default::default()
        };

        for t in trips {
            let txn = self.db.begin().await?;

            let t = lock_trip(&txn, t.id).await?;
            if t.driver_id.is_some() || t.status.is_terminal() {
                // Settled by someone else since the listing
                txn.rollback().await?;
                report.unassigned += 1;
                continue;
            }

            let query = DriverQuery {
                preferred_cab_id: t.cab_id,
                exclude: Vec::new(),
            };
            let Some(found) = claim_available_driver(&txn, query, now).await? else {
                txn.rollback().await?;
                report.unassigned += 1;
                continue;
            };

            let status = if t.status.awaits_assignment() {
                TripStatus::Assigned
            } else {
                t.status
            };

            trip::Entity::update_many()
                .col_expr(trip::Column::DriverId, Expr::value(Some(found.id)))
                .col_expr(trip::Column::Status, Expr::value(status))
                .col_expr(trip::Column::UpdatedAt, Expr::value(now.fixed_offset()))
                .filter(trip::Column::Id.eq(t.id))
                .exec(&txn)
                .await?;
            txn.commit().await?;

            report.assigned += 1;
            self.notify_assigned(&trip::Model {
                driver_id: Some(found.id),
                status,
                ..t
            });
        }

        if report.total > 0 {
            tracing::info!(
                total = report.total,
                assigned = report.assigned,
                unassigned = report.unassigned,
                "Driver assignment sweep finished"
            );
        }

        Ok(report)
    }
}

async fn ensure_cab_exists<C: ConnectionTrait>(conn: &C, cab_id: Uuid) -> AppResult<()> {
    cab::Entity::find_by_id(cab_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Cab not found".to_string()))?;
    Ok(())
}
