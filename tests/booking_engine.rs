mod common;

use common::*;

use hotel_ops_backend::entities::booking::{BookingStatus, PaymentMethod, PaymentStatus};
use hotel_ops_backend::entities::payment_transaction::{TransactionKind, TransactionStatus};
use hotel_ops_backend::entities::trip::TripStatus;
use hotel_ops_backend::error::AppError;
use hotel_ops_backend::services::booking::{BookingAmendment, BookingEngine, PaymentEntry};
use hotel_ops_backend::services::dispatch::{DispatchEngine, TripRequest};
use hotel_ops_backend::services::payment::IntentStatus;

fn cash(amount: i64) -> PaymentEntry {
    PaymentEntry {
        amount,
        method: PaymentMethod::Cash,
        reference: None,
        notes: None,
    }
}

#[tokio::test]
async fn test_overlap_rejected_and_touching_stay_accepted() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let first = engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.unwrap();

    let err = engine
        .create(stay(r.id, jan(2, 14), jan(4, 11)), jan(1, 0))
        .await
        .unwrap_err();
    match err {
        AppError::Conflict { conflict_booking_id, .. } => assert_eq!(conflict_booking_id, Some(first.id)),
        other => panic!("expected conflict, got {:?}", other),
    }

    let touching = engine.create(stay(r.id, jan(3, 11), jan(5, 11)), jan(1, 0)).await;
    assert!(touching.is_ok());
    assert_eq!(engine.list(Some(r.id)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_other_rooms_and_inactive_bookings_do_not_block() {
    let db = setup_db().await;
    let a = room(&db, "101").await;
    let b = room(&db, "102").await;
    let engine = BookingEngine::new(&db, None, policy());

    let first = engine.create(stay(a.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.unwrap();
    assert!(engine.create(stay(b.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.is_ok());

    engine.change_status(first.id, BookingStatus::NoShow, jan(1, 0)).await.unwrap();
    assert!(engine.create(stay(a.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.is_ok());
}

#[tokio::test]
async fn test_creation_validation() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let reversed = engine.create(stay(r.id, jan(3, 11), jan(1, 14)), jan(1, 0)).await;
    assert!(matches!(reversed, Err(AppError::Validation(_))));

    let mut nobody = stay(r.id, jan(1, 14), jan(3, 11));
    nobody.adults = 0;
    assert!(matches!(engine.create(nobody, jan(1, 0)).await, Err(AppError::Validation(_))));

    let mut anonymous = stay(r.id, jan(1, 14), jan(3, 11));
    anonymous.guest.full_name = " ".to_string();
    assert!(matches!(engine.create(anonymous, jan(1, 0)).await, Err(AppError::Validation(_))));

    let mut negative = stay(r.id, jan(1, 14), jan(3, 11));
    negative.total_amount = -1;
    assert!(matches!(engine.create(negative, jan(1, 0)).await, Err(AppError::Validation(_))));

    let mut checked_in = stay(r.id, jan(1, 14), jan(3, 11));
    checked_in.status = Some(BookingStatus::CheckedIn);
    assert!(matches!(engine.create(checked_in, jan(1, 0)).await, Err(AppError::Validation(_))));

    let missing_room = engine
        .create(stay(uuid::Uuid::new_v4(), jan(1, 14), jan(3, 11)), jan(1, 0))
        .await;
    assert!(matches!(missing_room, Err(AppError::NotFound(_))));

    assert!(engine.list(None).await.unwrap().is_empty());
}

/// The test pool has one connection and SQLite has no `FOR UPDATE`, so the
/// two creates run one after the other here. This checks the outcome of
/// that ordering; the room row lock itself only matters on Postgres.
#[tokio::test]
async fn test_concurrent_creates_admit_exactly_one() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let (a, b) = tokio::join!(
        engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 0)),
        engine.create(stay(r.id, jan(2, 14), jan(4, 11)), jan(1, 0)),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    assert!(matches!(a.err().or(b.err()), Some(AppError::Conflict { .. })));
    assert_eq!(engine.list(Some(r.id)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_amendment_rechecks_only_real_changes() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let first = engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.unwrap();
    let second = engine.create(stay(r.id, jan(5, 14), jan(7, 11)), jan(1, 0)).await.unwrap();

    // Extending into its own interval does not conflict with itself
    let extended = engine
        .amend(
            first.id,
            BookingAmendment {
                check_out: Some(jan(4, 11)),
                ..Default::default()
            },
            jan(1, 0),
        )
        .await
        .unwrap();
    assert_eq!(extended.check_out, jan(4, 11).fixed_offset());

    let err = engine
        .amend(
            second.id,
            BookingAmendment {
                check_in: Some(jan(3, 14)),
                ..Default::default()
            },
            jan(1, 0),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Conflict { conflict_booking_id: Some(id), .. } if id == first.id
    ));

    // Guest details alone never trigger the check
    let mut guest = guest();
    guest.full_name = "Ada King".to_string();
    let renamed = engine
        .amend(
            second.id,
            BookingAmendment {
                guest: Some(guest),
                ..Default::default()
            },
            jan(1, 0),
        )
        .await
        .unwrap();
    assert_eq!(renamed.guest_name, "Ada King");
}

#[tokio::test]
async fn test_invalid_transitions_are_rejected() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let b = engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.unwrap();

    let err = engine
        .change_status(b.id, BookingStatus::CheckedOut, jan(1, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));

    engine.change_status(b.id, BookingStatus::NoShow, jan(1, 0)).await.unwrap();
    let err = engine
        .change_status(b.id, BookingStatus::Confirmed, jan(1, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
}

#[tokio::test]
async fn test_check_in_time_is_written_once() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let b = engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.unwrap();
    engine.change_status(b.id, BookingStatus::Confirmed, jan(1, 9)).await.unwrap();
    let checked_in = engine.change_status(b.id, BookingStatus::CheckedIn, jan(1, 15)).await.unwrap();
    assert_eq!(checked_in.check_in_time, Some(jan(1, 15).fixed_offset()));

    let again = engine.change_status(b.id, BookingStatus::CheckedIn, jan(2, 8)).await.unwrap();
    assert_eq!(again.check_in_time, Some(jan(1, 15).fixed_offset()));

    let out = engine.change_status(b.id, BookingStatus::CheckedOut, jan(3, 10)).await.unwrap();
    assert_eq!(out.check_out_time, Some(jan(3, 10).fixed_offset()));
}

#[tokio::test]
async fn test_cancelling_pending_payment_is_rejected() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let b = engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.unwrap();
    assert_eq!(b.payment_status, PaymentStatus::Pending);

    let err = engine.cancel(b.id, jan(1, 0)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));

    let unchanged = engine.get(b.id).await.unwrap();
    assert_eq!(unchanged.status, BookingStatus::Pending);
    assert_eq!(unchanged.refunded_amount, 0);
    assert!(engine.transactions(b.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelling_paid_booking_refunds_seventy_percent() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let b = engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.unwrap();
    let paid = engine.record_payment(b.id, cash(100), jan(1, 1)).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let cancelled = engine.cancel(b.id, jan(1, 2)).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    assert_eq!(cancelled.refunded_amount, 70);

    let transactions = engine.transactions(b.id).await.unwrap();
    assert_eq!(transactions.len(), 2);
    let refund = &transactions[1];
    assert_eq!(refund.seq, 2);
    assert_eq!(refund.kind, TransactionKind::CancellationRefund);
    assert_eq!(refund.amount, 70);
    // Cash refunds are handed to staff
    assert_eq!(refund.status, TransactionStatus::Pending);
    assert!(refund.notes.contains("manual"));

    // The slot is free again
    assert!(engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 3)).await.is_ok());

    let err = engine.cancel(b.id, jan(1, 4)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
}

#[tokio::test]
async fn test_cancelling_very_large_paid_booking() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());
    let total = i64::MAX / 2;

    let mut input = stay(r.id, jan(1, 14), jan(3, 11));
    input.total_amount = total;
    let b = engine.create(input, jan(1, 0)).await.unwrap();
    engine.record_payment(b.id, cash(total), jan(1, 1)).await.unwrap();

    let cancelled = engine.cancel(b.id, jan(1, 2)).await.unwrap();
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    assert_eq!(cancelled.refunded_amount, (i128::from(total) * 70 / 100) as i64);
}

#[tokio::test]
async fn test_changing_total_rederives_payment_status() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let b = engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.unwrap();
    let paid = engine.record_payment(b.id, cash(100), jan(1, 1)).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let raised = engine
        .amend(
            b.id,
            BookingAmendment {
                total_amount: Some(150),
                ..Default::default()
            },
            jan(1, 2),
        )
        .await
        .unwrap();
    assert_eq!(raised.total_amount, 150);
    assert_eq!(raised.payment_status, PaymentStatus::Partial);

    let lowered = engine
        .amend(
            b.id,
            BookingAmendment {
                total_amount: Some(80),
                ..Default::default()
            },
            jan(1, 3),
        )
        .await
        .unwrap();
    assert_eq!(lowered.payment_status, PaymentStatus::Paid);

    // Nothing collected yet: a new total keeps it pending
    let other = engine.create(stay(r.id, jan(5, 14), jan(6, 11)), jan(1, 0)).await.unwrap();
    let amended = engine
        .amend(
            other.id,
            BookingAmendment {
                total_amount: Some(0),
                ..Default::default()
            },
            jan(1, 4),
        )
        .await
        .unwrap();
    assert_eq!(amended.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_partial_payments_accumulate() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let b = engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.unwrap();

    let partial = engine.record_payment(b.id, cash(40), jan(1, 1)).await.unwrap();
    assert_eq!(partial.payment_status, PaymentStatus::Partial);

    let paid = engine.record_payment(b.id, cash(60), jan(1, 2)).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let seqs: Vec<i32> = engine.transactions(b.id).await.unwrap().iter().map(|t| t.seq).collect();
    assert_eq!(seqs, vec![1, 2]);

    let err = engine.record_payment(b.id, cash(0), jan(1, 3)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_cancellation_cancels_trips() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let c = cab(&db, "CAB-1").await;
    let d = driver(&db, "Dana", jan(1, 0)).await;
    let notifier = RecordingNotifier::default();
    let engine = BookingEngine::new(&db, None, policy());
    let dispatch = DispatchEngine::new(&db, &notifier);

    let b = engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.unwrap();
    engine.record_payment(b.id, cash(100), jan(1, 1)).await.unwrap();

    let t = dispatch
        .request_trip(
            TripRequest {
                booking_id: b.id,
                pick_up: "Airport".to_string(),
                drop_off: "Hotel".to_string(),
                pickup_time: Some(jan(1, 12)),
                cab_id: Some(c.id),
            },
            jan(1, 2),
        )
        .await
        .unwrap();
    assert_eq!(t.driver_id, Some(d));

    engine.cancel(b.id, jan(1, 3)).await.unwrap();

    let t = dispatch.get_trip(t.id).await.unwrap();
    assert_eq!(t.status, TripStatus::Cancelled);

    // Driver is free for the next request
    let drivers = hotel_ops_backend::services::fleet::list_drivers(&db).await.unwrap();
    assert_eq!(drivers[0].status, hotel_ops_backend::entities::driver::DriverStatus::Available);
}

#[tokio::test]
async fn test_early_checkout_records_single_full_refund() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let b = engine.create(stay(r.id, jan(5, 14), jan(8, 11)), jan(1, 0)).await.unwrap();
    engine.record_payment(b.id, cash(100), jan(5, 13)).await.unwrap();
    engine.change_status(b.id, BookingStatus::Confirmed, jan(5, 13)).await.unwrap();
    engine.change_status(b.id, BookingStatus::CheckedIn, jan(5, 15)).await.unwrap();

    let moved = BookingAmendment {
        check_out: Some(jan(4, 11)),
        status: Some(BookingStatus::CheckedOut),
        ..Default::default()
    };
    let out = engine.amend(b.id, moved.clone(), jan(5, 16)).await.unwrap();
    assert_eq!(out.status, BookingStatus::CheckedOut);
    assert_eq!(out.payment_status, PaymentStatus::Paid);
    assert_eq!(out.refunded_amount, 0);

    // A second amendment in the same shape does not duplicate the entry
    engine.amend(b.id, moved, jan(5, 17)).await.unwrap();

    let refunds: Vec<_> = engine
        .transactions(b.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TransactionKind::EarlyCheckoutRefund)
        .collect();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount, 100);
    assert_eq!(refunds[0].status, TransactionStatus::Pending);
    assert!(refunds[0].notes.contains("Early checkout"));
}

#[tokio::test]
async fn test_regular_checkout_records_no_refund() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let engine = BookingEngine::new(&db, None, policy());

    let b = engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(1, 0)).await.unwrap();
    engine.change_status(b.id, BookingStatus::Confirmed, jan(1, 1)).await.unwrap();
    engine.change_status(b.id, BookingStatus::CheckedIn, jan(1, 15)).await.unwrap();
    engine.change_status(b.id, BookingStatus::CheckedOut, jan(2, 9)).await.unwrap();

    assert!(engine.transactions(b.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_removes_booking_and_trips() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let notifier = RecordingNotifier::default();
    let engine = BookingEngine::new(&db, None, policy());
    let dispatch = DispatchEngine::new(&db, &notifier);

    let b = engine.create(stay(r.id, jan(1, 14), jan(3, 11)), jan(2, 0)).await.unwrap();
    let t = dispatch
        .request_trip(
            TripRequest {
                booking_id: b.id,
                pick_up: "Hotel".to_string(),
                drop_off: "Station".to_string(),
                pickup_time: None,
                cab_id: None,
            },
            jan(2, 0),
        )
        .await
        .unwrap();

    engine.delete(b.id, jan(2, 1)).await.unwrap();

    assert!(matches!(engine.get(b.id).await, Err(AppError::NotFound(_))));
    assert!(matches!(dispatch.get_trip(t.id).await, Err(AppError::NotFound(_))));
    let room = hotel_ops_backend::services::rooms::get_room(&db, r.id).await.unwrap();
    assert_eq!(room.status, hotel_ops_backend::entities::room::RoomStatus::Available);
}

// ============ Gateway-mediated payments ============

fn card_stay(room_id: uuid::Uuid) -> hotel_ops_backend::services::booking::NewBooking {
    let mut input = stay(room_id, jan(1, 14), jan(3, 11));
    input.payment_method = PaymentMethod::Card;
    input.external_payment_ref = Some("pi_123".to_string());
    input
}

#[tokio::test]
async fn test_confirmed_intent_creates_paid_booking() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let gateway = FakeGateway::new(IntentStatus::Succeeded, RefundOutcome::Succeed);
    let engine = BookingEngine::new(&db, Some(&gateway), policy());

    let b = engine.create(card_stay(r.id), jan(1, 0)).await.unwrap();
    assert_eq!(b.payment_status, PaymentStatus::Paid);

    let transactions = engine.transactions(b.id).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].kind, TransactionKind::Payment);
    assert_eq!(transactions[0].status, TransactionStatus::Succeeded);
    assert_eq!(transactions[0].reference.as_deref(), Some("pi_123"));
}

#[tokio::test]
async fn test_intent_awaiting_method_creates_pending_booking() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let gateway = FakeGateway::new(IntentStatus::RequiresPaymentMethod, RefundOutcome::Succeed);
    let engine = BookingEngine::new(&db, Some(&gateway), policy());

    let b = engine.create(card_stay(r.id), jan(1, 0)).await.unwrap();
    assert_eq!(b.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_unconfirmed_intent_creates_nothing() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let gateway = FakeGateway::new(IntentStatus::Processing, RefundOutcome::Succeed);
    let engine = BookingEngine::new(&db, Some(&gateway), policy());

    let err = engine.create(card_stay(r.id), jan(1, 0)).await.unwrap_err();
    assert!(matches!(err, AppError::PaymentRequired(_)));
    assert!(engine.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_card_booking_needs_gateway_and_reference() {
    let db = setup_db().await;
    let r = room(&db, "101").await;

    let without_gateway = BookingEngine::new(&db, None, policy());
    let err = without_gateway.create(card_stay(r.id), jan(1, 0)).await.unwrap_err();
    assert!(matches!(err, AppError::ExternalService(_)));

    let gateway = FakeGateway::new(IntentStatus::Succeeded, RefundOutcome::Succeed);
    let engine = BookingEngine::new(&db, Some(&gateway), policy());
    let mut no_ref = card_stay(r.id);
    no_ref.external_payment_ref = None;
    let err = engine.create(no_ref, jan(1, 0)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_gateway_refund_success_is_recorded() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let gateway = FakeGateway::new(IntentStatus::Succeeded, RefundOutcome::Succeed);
    let engine = BookingEngine::new(&db, Some(&gateway), policy());

    let b = engine.create(card_stay(r.id), jan(1, 0)).await.unwrap();
    engine.cancel(b.id, jan(1, 1)).await.unwrap();

    assert_eq!(gateway.refunds(), vec![("pi_123".to_string(), 70)]);

    let refund = engine.transactions(b.id).await.unwrap().pop().unwrap();
    assert_eq!(refund.kind, TransactionKind::CancellationRefund);
    assert_eq!(refund.status, TransactionStatus::Succeeded);
    assert_eq!(refund.reference.as_deref(), Some("re_pi_123"));
}

#[tokio::test]
async fn test_gateway_refund_failure_keeps_local_refund() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let gateway = FakeGateway::new(IntentStatus::Succeeded, RefundOutcome::Reject);
    let engine = BookingEngine::new(&db, Some(&gateway), policy());

    let b = engine.create(card_stay(r.id), jan(1, 0)).await.unwrap();
    let cancelled = engine.cancel(b.id, jan(1, 1)).await.unwrap();
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    assert_eq!(cancelled.refunded_amount, 70);

    let refund = engine.transactions(b.id).await.unwrap().pop().unwrap();
    assert_eq!(refund.status, TransactionStatus::Failed);
    assert!(refund.notes.contains("manual follow-up"));
}

#[tokio::test]
async fn test_gateway_refund_timeout_stays_pending() {
    let db = setup_db().await;
    let r = room(&db, "101").await;
    let gateway = FakeGateway::new(IntentStatus::Succeeded, RefundOutcome::Hang);
    let engine = BookingEngine::new(&db, Some(&gateway), policy());

    let b = engine.create(card_stay(r.id), jan(1, 0)).await.unwrap();
    let cancelled = engine.cancel(b.id, jan(1, 1)).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let refund = engine.transactions(b.id).await.unwrap().pop().unwrap();
    assert_eq!(refund.status, TransactionStatus::Pending);
    assert!(refund.notes.contains("retry"));
}
