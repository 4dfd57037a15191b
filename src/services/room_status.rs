//! Derives a room's status from the reservations touching "now".
//!
//! The projector only ever writes `Available`, `Reserved` or `Occupied`.
//! Maintenance is an independent flag on the room and is never cleared here.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::room::{self, RoomStatus};
use crate::error::{AppError, AppResult};
use crate::services::ledger;
use crate::utils::time::{local_date, to_utc};

fn status_for(booking: &booking::Model) -> RoomStatus {
    match booking.status {
        BookingStatus::CheckedIn => RoomStatus::Occupied,
        _ => RoomStatus::Reserved,
    }
}

/// Pure projection over a room's bookings. Non-active bookings are ignored.
///
/// 1. An active booking whose interval contains `now` decides the status
///    (earliest check-in wins if several do).
/// 2. Otherwise an active booking checking in today (hotel-local date) that
///    has not already ended decides it.
/// 3. Otherwise the room is `Available`. Future stays never promote it.
pub fn project(bookings: &[booking::Model], now: DateTime<Utc>, offset: FixedOffset) -> RoomStatus {
    let active = || bookings.iter().filter(|b| b.status.is_active());

    let current = active()
        .filter(|b| to_utc(&b.check_in) <= now && now < to_utc(&b.check_out))
        .min_by_key(|b| b.check_in);

    if let Some(b) = current {
        return status_for(b);
    }

    let today = local_date(&now, offset);
    let arriving = active()
        .filter(|b| local_date(&b.check_in, offset) == today && to_utc(&b.check_out) > now)
        .min_by_key(|b| b.check_in);

    arriving.map(status_for).unwrap_or(RoomStatus::Available)
}

/// Recompute and persist the status of one room inside the caller's
/// transaction. Takes the room lock first, so a projection can never be
/// written over a booking change committed after its read. Returns the
/// projected status and writes nothing when the stored value already matches.
pub async fn refresh_locked<C: ConnectionTrait>(
    conn: &C,
    room_id: Uuid,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> AppResult<RoomStatus> {
    let room = ledger::lock_room(conn, room_id).await?;

    let bookings = ledger::active_bookings(conn, room_id).await?;
    let status = project(&bookings, now, offset);

    if room.status != status {
        let previous = room.status;
        let mut active: room::ActiveModel = room.into();
        active.status = Set(status);
        active.updated_at = Set(now.into());
        active.update(conn).await?;

        tracing::info!(
            room_id = %room_id,
            from = ?previous,
            to = ?status,
            "Room status refreshed"
        );
    }

    Ok(status)
}

/// [`refresh_locked`] in a transaction of its own.
pub async fn refresh(
    db: &DatabaseConnection,
    room_id: Uuid,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> AppResult<RoomStatus> {
    let txn = db.begin().await?;
    let status = refresh_locked(&txn, room_id, now, offset).await?;
    txn.commit().await?;
    Ok(status)
}

/// Refresh every room, one transaction per room. Returns how many rooms
/// changed status.
pub async fn refresh_all(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> AppResult<usize> {
    let rooms = room::Entity::find().all(db).await?;

    let mut changed = 0;
    for r in rooms {
        let before = r.status;
        match refresh(db, r.id, now, offset).await {
            Ok(status) if status != before => changed += 1,
            Ok(_) => {}
            // Deleted since the listing
            Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(changed)
}
