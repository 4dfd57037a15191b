//! Booking lifecycle: creation, amendments, status transitions, payment
//! bookkeeping and the refund policy.
//!
//! Every write that can move a reservation (create, change of room or
//! dates) runs in one transaction that locks the affected room rows before
//! the overlap check, so concurrent writers on a room are serialized.
//! Lock order is always rooms first, then the booking row.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::BookingPolicy;
use crate::entities::booking::{self, BookingStatus, PaymentMethod, PaymentStatus};
use crate::entities::payment_transaction::{self, TransactionKind, TransactionStatus};
use crate::entities::room::{self, CleanStatus};
use crate::entities::trip::{self, TripStatus};
use crate::error::{AppError, AppResult};
use crate::services::payment::{with_timeout, GatewayError, IntentStatus, PaymentGateway};
use crate::services::{dispatch, ledger, room_status};
use crate::utils::time::{local_date, set_once, to_utc};

#[derive(Debug, Clone, Deserialize)]
pub struct GuestDetails {
    pub full_name: String,
    pub phone: String,
    pub country_code: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub room_id: Uuid,
    pub guest: GuestDetails,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub adults: i32,
    #[serde(default)]
    pub children: i32,
    pub total_amount: i64,
    pub payment_method: PaymentMethod,
    pub external_payment_ref: Option<String>,
    /// Initial status, `Pending` unless the desk confirms on creation.
    #[serde(default)]
    pub status: Option<BookingStatus>,
}

/// Partial update of a booking. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingAmendment {
    pub room_id: Option<Uuid>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: Option<BookingStatus>,
    pub adults: Option<i32>,
    pub children: Option<i32>,
    pub total_amount: Option<i64>,
    pub guest: Option<GuestDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntry {
    pub amount: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Amount returned to the guest when a paid booking is cancelled, rounded
/// down. Computed in `i128` so large totals cannot overflow mid-cancel.
pub fn cancellation_refund(total_amount: i64, refund_percent: i64) -> AppResult<i64> {
    let refund = i128::from(total_amount) * i128::from(refund_percent) / 100;
    i64::try_from(refund).map_err(|_| {
        AppError::Validation(format!(
            "Refund of {}% on {} is out of range",
            refund_percent, total_amount
        ))
    })
}

fn validate_guest(guest: &GuestDetails) -> AppResult<()> {
    if guest.full_name.trim().is_empty() {
        return Err(AppError::Validation("Guest full name is required".to_string()));
    }
    if guest.phone.trim().is_empty() || guest.country_code.trim().is_empty() {
        return Err(AppError::Validation(
            "Guest phone number and country code are required".to_string(),
        ));
    }
    Ok(())
}

fn validate_occupancy(adults: i32, children: i32) -> AppResult<()> {
    if adults < 1 {
        return Err(AppError::Validation("At least one adult is required".to_string()));
    }
    if children < 0 {
        return Err(AppError::Validation("Children cannot be negative".to_string()));
    }
    Ok(())
}

struct NewTransaction {
    kind: TransactionKind,
    amount: i64,
    method: PaymentMethod,
    status: TransactionStatus,
    reference: Option<String>,
    notes: String,
}

async fn append_transaction<C: ConnectionTrait>(
    conn: &C,
    booking_id: Uuid,
    entry: NewTransaction,
    now: DateTime<Utc>,
) -> AppResult<payment_transaction::Model> {
    let existing = payment_transaction::Entity::find()
        .filter(payment_transaction::Column::BookingId.eq(booking_id))
        .count(conn)
        .await?;

    let record = payment_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        booking_id: Set(booking_id),
        seq: Set(existing as i32 + 1),
        kind: Set(entry.kind),
        amount: Set(entry.amount),
        method: Set(entry.method),
        status: Set(entry.status),
        reference: Set(entry.reference),
        notes: Set(entry.notes),
        created_at: Set(now.into()),
    };

    Ok(record.insert(conn).await?)
}

/// Sum of the successful payments on file for a booking.
async fn collected_payments<C: ConnectionTrait>(conn: &C, booking_id: Uuid) -> AppResult<i64> {
    Ok(payment_transaction::Entity::find()
        .filter(payment_transaction::Column::BookingId.eq(booking_id))
        .filter(payment_transaction::Column::Kind.eq(TransactionKind::Payment))
        .filter(payment_transaction::Column::Status.eq(TransactionStatus::Succeeded))
        .all(conn)
        .await?
        .iter()
        .fold(0i64, |sum, t| sum.saturating_add(t.amount)))
}

pub struct BookingEngine<'a> {
    db: &'a DatabaseConnection,
    gateway: Option<&'a dyn PaymentGateway>,
    policy: BookingPolicy,
}

impl<'a> BookingEngine<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        gateway: Option<&'a dyn PaymentGateway>,
        policy: BookingPolicy,
    ) -> Self {
        Self { db, gateway, policy }
    }

    pub async fn get(&self, booking_id: Uuid) -> AppResult<booking::Model> {
        booking::Entity::find_by_id(booking_id)
            .one(self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
    }

    pub async fn list(&self, room_id: Option<Uuid>) -> AppResult<Vec<booking::Model>> {
        let mut select = booking::Entity::find().order_by_asc(booking::Column::CheckIn);
        if let Some(room_id) = room_id {
            select = select.filter(booking::Column::RoomId.eq(room_id));
        }
        Ok(select.all(self.db).await?)
    }

    pub async fn transactions(&self, booking_id: Uuid) -> AppResult<Vec<payment_transaction::Model>> {
        self.get(booking_id).await?;

        Ok(payment_transaction::Entity::find()
            .filter(payment_transaction::Column::BookingId.eq(booking_id))
            .order_by_asc(payment_transaction::Column::Seq)
            .all(self.db)
            .await?)
    }

    /// Confirm a gateway-mediated payment before anything is written.
    /// Returns the payment status the booking starts with.
    async fn confirm_gateway_payment(&self, input: &NewBooking) -> AppResult<PaymentStatus> {
        if !input.payment_method.is_gateway_mediated() {
            return Ok(PaymentStatus::Pending);
        }

        let intent_ref = input
            .external_payment_ref
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| {
                AppError::Validation(
                    "A payment intent reference is required for card and bank transfer payments"
                        .to_string(),
                )
            })?;

        let gateway = self.gateway.ok_or_else(|| {
            AppError::ExternalService("Payment gateway is not configured".to_string())
        })?;

        let intent = with_timeout(self.policy.gateway_timeout, gateway.retrieve_intent(intent_ref))
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        match intent.status {
            IntentStatus::Succeeded => Ok(PaymentStatus::Paid),
            IntentStatus::RequiresPaymentMethod => Ok(PaymentStatus::Pending),
            other => Err(AppError::PaymentRequired(format!(
                "Payment intent {} is not confirmed ({:?})",
                intent.id, other
            ))),
        }
    }

    /// Reserve a room. Fails with a conflict naming the existing booking if
    /// the room is already held for an overlapping interval.
    pub async fn create(&self, input: NewBooking, now: DateTime<Utc>) -> AppResult<booking::Model> {
        validate_guest(&input.guest)?;
        validate_occupancy(input.adults, input.children)?;

        if input.check_in >= input.check_out {
            return Err(AppError::Validation(
                "Check-out must be after check-in".to_string(),
            ));
        }
        if input.total_amount < 0 {
            return Err(AppError::Validation("Total amount cannot be negative".to_string()));
        }

        let status = match input.status {
            None | Some(BookingStatus::Pending) => BookingStatus::Pending,
            Some(BookingStatus::Confirmed) => BookingStatus::Confirmed,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "A new booking cannot start as {:?}",
                    other
                )))
            }
        };

        // Gateway I/O happens before any lock is taken
        let payment_status = self.confirm_gateway_payment(&input).await?;

        let txn = self.db.begin().await?;

        let room = ledger::lock_room(&txn, input.room_id).await?;
        if let Some(existing) =
            ledger::has_overlap(&txn, room.id, input.check_in, input.check_out, None).await?
        {
            tracing::warn!(
                room_id = %room.id,
                conflicting_booking_id = %existing.id,
                "Booking rejected: room already reserved"
            );
            return Err(AppError::booking_conflict(existing.id));
        }

        let guest = input.guest;
        let new_booking = booking::ActiveModel {
            id: Set(Uuid::new_v4()),
            room_id: Set(room.id),
            room_number: Set(room.room_number.clone()),
            status: Set(status),
            guest_name: Set(guest.full_name.trim().to_string()),
            guest_phone: Set(guest.phone.trim().to_string()),
            guest_country_code: Set(guest.country_code.trim().to_string()),
            guest_email: Set(guest.email),
            check_in: Set(input.check_in.into()),
            check_out: Set(input.check_out.into()),
            adults: Set(input.adults),
            children: Set(input.children),
            payment_status: Set(payment_status),
            payment_method: Set(input.payment_method),
            total_amount: Set(input.total_amount),
            refunded_amount: Set(0),
            external_payment_ref: Set(input.external_payment_ref.clone()),
            check_in_time: Set(None),
            check_out_time: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let booking = new_booking.insert(&txn).await?;

        if payment_status == PaymentStatus::Paid {
            append_transaction(
                &txn,
                booking.id,
                NewTransaction {
                    kind: TransactionKind::Payment,
                    amount: booking.total_amount,
                    method: booking.payment_method,
                    status: TransactionStatus::Succeeded,
                    reference: input.external_payment_ref,
                    notes: "Payment confirmed by gateway".to_string(),
                },
                now,
            )
            .await?;
        }

        room_status::refresh_locked(&txn, room.id, now, self.policy.hotel_offset).await?;
        txn.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            room_id = %booking.room_id,
            status = ?booking.status,
            payment_status = ?booking.payment_status,
            "Booking created"
        );

        Ok(booking)
    }

    /// Amend room, dates, occupancy, guest details or status.
    ///
    /// The overlap check re-runs (excluding this booking) only when the room
    /// or the dates actually change. A reversed interval (check-out before
    /// check-in) is accepted without a check; combined with `CheckedOut` it
    /// records a one-time early-checkout refund for the full amount.
    /// A new total re-derives the payment status from the payments on file.
    /// A target status of `Cancelled` is handled by [`Self::cancel`] and the
    /// other fields are ignored.
    pub async fn amend(
        &self,
        booking_id: Uuid,
        changes: BookingAmendment,
        now: DateTime<Utc>,
    ) -> AppResult<booking::Model> {
        if changes.status == Some(BookingStatus::Cancelled) {
            return self.cancel(booking_id, now).await;
        }
        if let Some(guest) = &changes.guest {
            validate_guest(guest)?;
        }
        if changes.total_amount.is_some_and(|t| t < 0) {
            return Err(AppError::Validation("Total amount cannot be negative".to_string()));
        }

        let txn = self.db.begin().await?;

        let snapshot = booking::Entity::find_by_id(booking_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
        let new_room_id = changes.room_id.unwrap_or(snapshot.room_id);

        let rooms = ledger::lock_rooms(&txn, &[snapshot.room_id, new_room_id]).await?;

        let current = booking::Entity::find_by_id(booking_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
        if current.room_id != snapshot.room_id {
            return Err(AppError::conflict(
                "Booking was moved concurrently, please retry",
            ));
        }

        let next_status = changes.status.unwrap_or(current.status);
        if !current.status.can_transition_to(next_status) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot move booking from {:?} to {:?}",
                current.status, next_status
            )));
        }

        let adults = changes.adults.unwrap_or(current.adults);
        let children = changes.children.unwrap_or(current.children);
        validate_occupancy(adults, children)?;

        let check_in = changes.check_in.unwrap_or_else(|| to_utc(&current.check_in));
        let check_out = changes.check_out.unwrap_or_else(|| to_utc(&current.check_out));
        let room_changed = new_room_id != current.room_id;
        let dates_changed =
            check_in != to_utc(&current.check_in) || check_out != to_utc(&current.check_out);

        if (room_changed || dates_changed) && next_status.is_active() && check_in < check_out {
            if let Some(existing) =
                ledger::has_overlap(&txn, new_room_id, check_in, check_out, Some(current.id)).await?
            {
                tracing::warn!(
                    booking_id = %current.id,
                    room_id = %new_room_id,
                    conflicting_booking_id = %existing.id,
                    "Amendment rejected: room already reserved"
                );
                return Err(AppError::booking_conflict(existing.id));
            }
        }

        let previous_status = current.status;
        let previous_room_id = current.room_id;
        let mut active: booking::ActiveModel = current.clone().into();

        if room_changed {
            let target = rooms
                .iter()
                .find(|r| r.id == new_room_id)
                .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;
            active.room_id = Set(target.id);
            active.room_number = Set(target.room_number.clone());
        }
        if dates_changed {
            active.check_in = Set(check_in.into());
            active.check_out = Set(check_out.into());
        }
        active.adults = Set(adults);
        active.children = Set(children);
        if let Some(total) = changes.total_amount.filter(|t| *t != current.total_amount) {
            active.total_amount = Set(total);
            if current.payment_status != PaymentStatus::Refunded {
                let collected = collected_payments(&txn, current.id).await?;
                active.payment_status = Set(PaymentStatus::from_collected(collected, total));
            }
        }
        if let Some(guest) = changes.guest {
            active.guest_name = Set(guest.full_name.trim().to_string());
            active.guest_phone = Set(guest.phone.trim().to_string());
            active.guest_country_code = Set(guest.country_code.trim().to_string());
            active.guest_email = Set(guest.email);
        }
        active.status = Set(next_status);

        let mut check_in_time = current.check_in_time;
        if next_status == BookingStatus::CheckedIn && set_once(&mut check_in_time, now.into()) {
            active.check_in_time = Set(check_in_time);
        }
        let mut check_out_time = current.check_out_time;
        if next_status == BookingStatus::CheckedOut && set_once(&mut check_out_time, now.into()) {
            active.check_out_time = Set(check_out_time);
        }
        active.updated_at = Set(now.into());

        let booking = active.update(&txn).await?;

        if next_status == BookingStatus::CheckedOut && previous_status != BookingStatus::CheckedOut {
            mark_room_dirty(&txn, booking.room_id, now).await?;
        }

        if next_status == BookingStatus::CheckedOut {
            self.record_early_checkout_refund(&txn, &booking, now).await?;
        }

        room_status::refresh_locked(&txn, booking.room_id, now, self.policy.hotel_offset).await?;
        if room_changed {
            room_status::refresh_locked(&txn, previous_room_id, now, self.policy.hotel_offset).await?;
        }

        txn.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            room_id = %booking.room_id,
            from = ?previous_status,
            to = ?booking.status,
            room_changed,
            dates_changed,
            "Booking amended"
        );

        Ok(booking)
    }

    /// One-time full refund entry for a checked-out booking whose stored
    /// check-out date falls before its check-in date. The entry is left
    /// `pending` for staff; payment status and refunded amount are untouched.
    async fn record_early_checkout_refund<C: ConnectionTrait>(
        &self,
        conn: &C,
        booking: &booking::Model,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let offset = self.policy.hotel_offset;
        let check_in_date = local_date(&booking.check_in, offset);
        let check_out_date = local_date(&booking.check_out, offset);
        if check_out_date >= check_in_date {
            return Ok(());
        }

        let already_recorded = payment_transaction::Entity::find()
            .filter(payment_transaction::Column::BookingId.eq(booking.id))
            .filter(payment_transaction::Column::Kind.eq(TransactionKind::EarlyCheckoutRefund))
            .one(conn)
            .await?
            .is_some();
        if already_recorded {
            return Ok(());
        }

        append_transaction(
            conn,
            booking.id,
            NewTransaction {
                kind: TransactionKind::EarlyCheckoutRefund,
                amount: booking.total_amount,
                method: booking.payment_method,
                status: TransactionStatus::Pending,
                reference: None,
                notes: format!(
                    "Early checkout: check-out date {} is before check-in date {}; full refund awaiting processing",
                    check_out_date, check_in_date
                ),
            },
            now,
        )
        .await?;

        tracing::warn!(
            booking_id = %booking.id,
            amount = booking.total_amount,
            "Early checkout refund recorded"
        );

        Ok(())
    }

    /// Move a booking to `target`, routing cancellations through the refund
    /// policy.
    pub async fn change_status(
        &self,
        booking_id: Uuid,
        target: BookingStatus,
        now: DateTime<Utc>,
    ) -> AppResult<booking::Model> {
        if target == BookingStatus::Cancelled {
            return self.cancel(booking_id, now).await;
        }

        let changes = BookingAmendment {
            status: Some(target),
            ..Default::default()
        };
        self.amend(booking_id, changes, now).await
    }

    /// Cancel a booking.
    ///
    /// Bookings whose payment is still pending cannot be cancelled. A paid
    /// booking is refunded the configured share of its total; the local
    /// bookkeeping commits first and the gateway refund is attempted
    /// afterwards, its outcome recorded on the refund transaction. Open
    /// trips of the booking are cancelled with it.
    pub async fn cancel(&self, booking_id: Uuid, now: DateTime<Utc>) -> AppResult<booking::Model> {
        let txn = self.db.begin().await?;

        let snapshot = booking::Entity::find_by_id(booking_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
        ledger::lock_room(&txn, snapshot.room_id).await?;

        let current = booking::Entity::find_by_id(booking_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if !current.status.can_transition_to(BookingStatus::Cancelled)
            || current.status == BookingStatus::Cancelled
        {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot cancel a {:?} booking",
                current.status
            )));
        }
        if current.payment_status == PaymentStatus::Pending {
            return Err(AppError::InvalidStateTransition(
                "Cannot cancel a booking whose payment is still pending".to_string(),
            ));
        }

        let refund = if current.payment_status == PaymentStatus::Paid {
            Some(cancellation_refund(current.total_amount, self.policy.refund_percent)?)
        } else {
            None
        };

        let mut active: booking::ActiveModel = current.clone().into();
        active.status = Set(BookingStatus::Cancelled);
        if let Some(amount) = refund {
            active.payment_status = Set(PaymentStatus::Refunded);
            active.refunded_amount = Set(amount);
        }
        active.updated_at = Set(now.into());
        let booking = active.update(&txn).await?;

        let refund_record = match refund {
            Some(amount) => Some(
                append_transaction(
                    &txn,
                    booking.id,
                    NewTransaction {
                        kind: TransactionKind::CancellationRefund,
                        amount,
                        method: booking.payment_method,
                        status: TransactionStatus::Pending,
                        reference: None,
                        notes: format!(
                            "Cancellation refund of {} ({}% of {}) requested",
                            amount, self.policy.refund_percent, booking.total_amount
                        ),
                    },
                    now,
                )
                .await?,
            ),
            None => None,
        };

        let cancelled_trips = dispatch::cancel_trips_for_booking(&txn, booking.id, now).await?;
        room_status::refresh_locked(&txn, booking.room_id, now, self.policy.hotel_offset).await?;

        txn.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            refund = ?refund,
            cancelled_trips,
            "Booking cancelled"
        );

        if let Some(record) = refund_record {
            self.settle_refund(&booking, record).await;
        }

        Ok(booking)
    }

    /// Best-effort gateway refund for an already committed cancellation.
    /// Never fails: the outcome is written onto the transaction record.
    async fn settle_refund(&self, booking: &booking::Model, record: payment_transaction::Model) {
        let amount = record.amount;

        let (status, reference, notes) = match (self.gateway, booking.external_payment_ref.as_deref()) {
            (Some(gateway), Some(intent_ref)) => {
                match with_timeout(self.policy.gateway_timeout, gateway.refund(intent_ref, amount)).await {
                    Ok(refund_ref) => (
                        TransactionStatus::Succeeded,
                        Some(refund_ref),
                        format!("Refund of {} processed by gateway", amount),
                    ),
                    Err(GatewayError::Timeout) => (
                        TransactionStatus::Pending,
                        None,
                        format!("Gateway timed out; refund of {} pending retry", amount),
                    ),
                    Err(e) => {
                        tracing::warn!(booking_id = %booking.id, error = %e, "Gateway refund failed");
                        (
                            TransactionStatus::Failed,
                            None,
                            format!("Gateway refund of {} failed ({}); manual follow-up required", amount, e),
                        )
                    }
                }
            }
            _ => (
                TransactionStatus::Pending,
                None,
                format!("Refund of {} requires manual follow-up", amount),
            ),
        };

        let mut active: payment_transaction::ActiveModel = record.into();
        active.status = Set(status);
        active.reference = Set(reference);
        active.notes = Set(notes);

        if let Err(e) = active.update(self.db).await {
            tracing::error!(booking_id = %booking.id, error = %e, "Failed to record refund outcome");
        }
    }

    /// Record money received against a booking and recompute its payment
    /// status from the successful payments on file.
    pub async fn record_payment(
        &self,
        booking_id: Uuid,
        entry: PaymentEntry,
        now: DateTime<Utc>,
    ) -> AppResult<booking::Model> {
        if entry.amount <= 0 {
            return Err(AppError::Validation("Payment amount must be positive".to_string()));
        }

        let txn = self.db.begin().await?;

        let current = booking::Entity::find_by_id(booking_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if matches!(current.status, BookingStatus::Cancelled | BookingStatus::NoShow)
            || current.payment_status == PaymentStatus::Refunded
        {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot record a payment on a {:?} booking",
                current.status
            )));
        }

        append_transaction(
            &txn,
            current.id,
            NewTransaction {
                kind: TransactionKind::Payment,
                amount: entry.amount,
                method: entry.method,
                status: TransactionStatus::Succeeded,
                reference: entry.reference,
                notes: entry.notes.unwrap_or_else(|| "Payment received".to_string()),
            },
            now,
        )
        .await?;

        let collected = collected_payments(&txn, current.id).await?;

        let payment_status = PaymentStatus::from_collected(collected, current.total_amount);

        let mut active: booking::ActiveModel = current.into();
        active.payment_status = Set(payment_status);
        active.payment_method = Set(entry.method);
        active.updated_at = Set(now.into());
        let booking = active.update(&txn).await?;

        txn.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            amount = entry.amount,
            collected,
            payment_status = ?booking.payment_status,
            "Payment recorded"
        );

        Ok(booking)
    }

    /// Administrative removal. Deletes the booking with its trips and
    /// payment history, frees any driver still on one of its trips and
    /// refreshes the room.
    pub async fn delete(&self, booking_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let txn = self.db.begin().await?;

        let booking = booking::Entity::find_by_id(booking_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
        ledger::lock_room(&txn, booking.room_id).await?;

        let open_trips = trip::Entity::find()
            .filter(trip::Column::BookingId.eq(booking.id))
            .filter(trip::Column::Status.is_in(TripStatus::NON_TERMINAL))
            .all(&txn)
            .await?;
        for t in &open_trips {
            if let Some(driver_id) = t.driver_id {
                dispatch::release_driver(&txn, driver_id, now).await?;
            }
        }

        let trips = trip::Entity::delete_many()
            .filter(trip::Column::BookingId.eq(booking.id))
            .exec(&txn)
            .await?;
        payment_transaction::Entity::delete_many()
            .filter(payment_transaction::Column::BookingId.eq(booking.id))
            .exec(&txn)
            .await?;
        booking::Entity::delete_by_id(booking.id).exec(&txn).await?;

        room_status::refresh_locked(&txn, booking.room_id, now, self.policy.hotel_offset).await?;
        txn.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            room_id = %booking.room_id,
            deleted_trips = trips.rows_affected,
            "Booking deleted"
        );

        Ok(())
    }
}

async fn mark_room_dirty<C: ConnectionTrait>(conn: &C, room_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
    let room = room::Entity::find_by_id(room_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    let mut active: room::ActiveModel = room.into();
    active.clean_status = Set(CleanStatus::Dirty);
    active.updated_at = Set(now.into());
    active.update(conn).await?;

    Ok(())
}
