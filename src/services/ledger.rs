//! Room allocation ledger.
//!
//! Answers whether a room already holds an active reservation overlapping a
//! date range. Callers that write bookings must first take the room lock with
//! [`lock_room`] inside the same transaction, so the check and the write
//! cannot interleave with another writer on that room.

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::room;
use crate::error::{AppError, AppResult};
use crate::utils::time::to_utc;

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`
/// conflict iff each starts before the other ends. Touching endpoints do not.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Load a room and take an exclusive row lock on it for the rest of the
/// transaction.
pub async fn lock_room<C: ConnectionTrait>(conn: &C, room_id: Uuid) -> AppResult<room::Model> {
    room::Entity::find_by_id(room_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))
}

/// Lock several rooms in a stable order so two writers never wait on each
/// other in opposite orders.
pub async fn lock_rooms<C: ConnectionTrait>(conn: &C, room_ids: &[Uuid]) -> AppResult<Vec<room::Model>> {
    let mut ids = room_ids.to_vec();
    ids.sort();
    ids.dedup();

    let mut rooms = Vec::with_capacity(ids.len());
    for id in ids {
        rooms.push(lock_room(conn, id).await?);
    }
    Ok(rooms)
}

/// All active bookings on a room, earliest check-in first.
pub async fn active_bookings<C: ConnectionTrait>(conn: &C, room_id: Uuid) -> AppResult<Vec<booking::Model>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::RoomId.eq(room_id))
        .filter(booking::Column::Status.is_in(BookingStatus::ACTIVE))
        .order_by_asc(booking::Column::CheckIn)
        .all(conn)
        .await?;

    Ok(bookings)
}

/// Find an active booking on `room_id` whose interval overlaps
/// `[check_in, check_out)`, ignoring `exclude` (the booking being amended).
/// Any one conflict is enough for the caller to reject.
pub async fn has_overlap<C: ConnectionTrait>(
    conn: &C,
    room_id: Uuid,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> AppResult<Option<booking::Model>> {
    let conflict = active_bookings(conn, room_id)
        .await?
        .into_iter()
        .filter(|b| Some(b.id) != exclude)
        .find(|b| overlaps(to_utc(&b.check_in), to_utc(&b.check_out), check_in, check_out));

    if let Some(existing) = &conflict {
        tracing::debug!(
            room_id = %room_id,
            conflicting_booking_id = %existing.id,
            "Overlapping reservation found"
        );
    }

    Ok(conflict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jan(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_overlapping_ranges_conflict() {
        assert!(overlaps(jan(1), jan(3), jan(2), jan(4)));
        assert!(overlaps(jan(2), jan(4), jan(1), jan(3)));
        // Containment
        assert!(overlaps(jan(1), jan(10), jan(3), jan(4)));
    }

    #[test]
    fn test_touching_ranges_do_not_conflict() {
        assert!(!overlaps(jan(1), jan(3), jan(3), jan(5)));
        assert!(!overlaps(jan(3), jan(5), jan(1), jan(3)));
    }

    #[test]
    fn test_disjoint_ranges_do_not_conflict() {
        assert!(!overlaps(jan(1), jan(2), jan(5), jan(6)));
    }
}
