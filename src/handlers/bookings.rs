use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PaymentMethod, PaymentStatus};
use crate::entities::payment_transaction::{self, TransactionKind, TransactionStatus};
use crate::error::{AppError, AppResult};
use crate::services::booking::{BookingAmendment, NewBooking, PaymentEntry};
use crate::services::payment::{with_timeout, PaymentIntent};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct GuestInfo {
    pub full_name: String,
    pub phone: String,
    pub country_code: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentInfo {
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub total_amount: i64,
    pub refunded_amount: i64,
    pub external_payment_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub room_id: Uuid,
    pub room_number: String,
    pub status: BookingStatus,
    pub guest: GuestInfo,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub adults: i32,
    pub children: i32,
    pub payment: PaymentInfo,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<booking::Model> for BookingResponse {
    fn from(b: booking::Model) -> Self {
        Self {
            id: b.id,
            room_id: b.room_id,
            room_number: b.room_number,
            status: b.status,
            guest: GuestInfo {
                full_name: b.guest_name,
                phone: b.guest_phone,
                country_code: b.guest_country_code,
                email: b.guest_email,
            },
            check_in: b.check_in.with_timezone(&Utc),
            check_out: b.check_out.with_timezone(&Utc),
            adults: b.adults,
            children: b.children,
            payment: PaymentInfo {
                status: b.payment_status,
                method: b.payment_method,
                total_amount: b.total_amount,
                refunded_amount: b.refunded_amount,
                external_payment_ref: b.external_payment_ref,
            },
            check_in_time: b.check_in_time.map(|t| t.with_timezone(&Utc)),
            check_out_time: b.check_out_time.map(|t| t.with_timezone(&Utc)),
            created_at: b.created_at.with_timezone(&Utc),
            updated_at: b.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub seq: i32,
    pub kind: TransactionKind,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl From<payment_transaction::Model> for TransactionResponse {
    fn from(t: payment_transaction::Model) -> Self {
        Self {
            id: t.id,
            seq: t.seq,
            kind: t.kind,
            amount: t.amount,
            method: t.method,
            status: t.status,
            reference: t.reference,
            notes: t.notes,
            created_at: t.created_at.with_timezone(&Utc),
        }
    }
}

/// Create a booking (staff)
pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<NewBooking>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let booking = state.bookings().create(payload, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

#[derive(Debug, Deserialize)]
pub struct BookingFilter {
    pub room_id: Option<Uuid>,
}

/// List bookings, optionally for one room (staff)
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(filter): Query<BookingFilter>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = state.bookings().list(filter.room_id).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state.bookings().get(booking_id).await?;
    Ok(Json(booking.into()))
}

/// Amend room, dates, guest or status (staff)
pub async fn update_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<BookingAmendment>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state.bookings().amend(booking_id, payload, Utc::now()).await?;
    Ok(Json(booking.into()))
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: BookingStatus,
}

pub async fn change_status(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<ChangeStatusRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state
        .bookings()
        .change_status(booking_id, payload.status, Utc::now())
        .await?;
    Ok(Json(booking.into()))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state.bookings().cancel(booking_id, Utc::now()).await?;
    Ok(Json(booking.into()))
}

/// Record money received at the desk (staff)
pub async fn record_payment(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<PaymentEntry>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state
        .bookings()
        .record_payment(booking_id, payload, Utc::now())
        .await?;
    Ok(Json(booking.into()))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<Vec<TransactionResponse>>> {
    let transactions = state.bookings().transactions(booking_id).await?;
    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}

/// Remove a booking with its trips and payment history (admin)
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    state.bookings().delete(booking_id, Utc::now()).await?;
    Ok(Json(serde_json::json!({ "message": "Booking deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub amount: i64,
    pub currency: String,
}

/// Open a gateway payment intent ahead of a card or bank transfer booking
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(payload): Json<CreateIntentRequest>,
) -> AppResult<(StatusCode, Json<PaymentIntent>)> {
    if payload.amount <= 0 {
        return Err(AppError::Validation("Amount must be positive".to_string()));
    }

    let gateway = state
        .gateway
        .as_deref()
        .ok_or_else(|| AppError::ExternalService("Payment gateway is not configured".to_string()))?;

    let intent = with_timeout(
        state.config.gateway_timeout(),
        gateway.create_intent(payload.amount, &payload.currency.to_lowercase()),
    )
    .await
    .map_err(|e| AppError::ExternalService(e.to_string()))?;

    tracing::info!(intent_id = %intent.id, amount = payload.amount, "Payment intent created");
    Ok((StatusCode::CREATED, Json(intent)))
}
