//! Booking and cancellation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use domain::{BookingRequest, RawBookingRequest, Reservation, ReservationId};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct BookingResponse {
    pub reservation: Reservation,
}

#[derive(Serialize)]
pub struct CancellationResponse {
    pub success: bool,
    pub reservation: Reservation,
}

/// POST /book: validates the request and runs the booking saga.
#[tracing::instrument(skip(state, body))]
pub async fn book(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RawBookingRequest>, JsonRejection>,
) -> Result<Json<BookingResponse>, ApiError> {
    let Json(raw) = body?;
    let request = BookingRequest::parse(&raw)?;

    let reservation = state.booking.book(request).await?;
    Ok(Json(BookingResponse { reservation }))
}

/// POST /cancel/{id}: runs the cancellation saga.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CancellationResponse>, ApiError> {
    let reservation = state.cancellation.cancel(&ReservationId::new(id)).await?;
    Ok(Json(CancellationResponse {
        success: true,
        reservation,
    }))
}
