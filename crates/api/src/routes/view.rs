//! Aggregated view endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use view::HotelView;

use crate::AppState;

/// GET /view: always 200; unavailable sources are flagged in
/// `services_status`.
#[tracing::instrument(skip(state))]
pub async fn get(State(state): State<Arc<AppState>>) -> Json<HotelView> {
    Json(state.view.build().await)
}
