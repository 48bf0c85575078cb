//! HTTP API server for the hotel booking orchestrator.
//!
//! Exposes the booking and cancellation sagas and the aggregated view, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use gateways::Gateways;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{AlertSink, BookingOrchestrator, CancellationOrchestrator, SagaConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use view::{ViewBuilder, ViewConfig};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub booking: BookingOrchestrator,
    pub cancellation: CancellationOrchestrator,
    pub view: ViewBuilder,
}

impl AppState {
    /// Wires every component to the same gateway handles and alert sink.
    pub fn new(
        gateways: Gateways,
        saga_config: SagaConfig,
        view_config: ViewConfig,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            booking: BookingOrchestrator::new(gateways.clone(), saga_config, alerts.clone()),
            cancellation: CancellationOrchestrator::new(gateways.clone(), saga_config, alerts),
            view: ViewBuilder::new(gateways, view_config),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/book", post(routes::booking::book))
        .route("/cancel/{id}", post(routes::booking::cancel))
        .route("/view", get(routes::view::get))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
