use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use chrono::Utc;
use futures::stream::{self, Stream};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::trips::TripResponse;
use crate::services::notify::Notification;
use crate::services::trip;
use crate::utils::jwt::Claims;
use crate::AppState;

/// List trips assigned to the logged-in driver
pub async fn my_trips(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<TripResponse>>> {
    let trips = trip::list_driver_trips(&state.db, claims.sub).await?;
    Ok(Json(trips.into_iter().map(Into::into).collect()))
}

/// Move one of the driver's own trips to its next status
pub async fn advance_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<TripResponse>> {
    let trip = trip::advance_trip(&state.db, trip_id, claims.sub, Utc::now()).await?;
    Ok(Json(trip.into()))
}

/// Live assignment notifications for the logged-in driver
pub async fn events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.notifier.register_connection(claims.sub);
    tracing::debug!(driver_id = %claims.sub, "Driver event stream opened");

    let stream = stream::unfold(rx, |mut rx| async move {
        let Notification { event, payload } = rx.recv().await?;
        let sse = Event::default()
            .event(&event)
            .json_data(payload)
            .unwrap_or_else(|_| Event::default().event(event));
        Some((Ok(sse), rx))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
