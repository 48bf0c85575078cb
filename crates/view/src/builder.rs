//! Concurrent fan-out over the four sources.

use std::time::{Duration, Instant};

use gateways::{Gateways, Service, with_timeout};

use crate::model::{HotelView, ServicesStatus};

/// View builder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    /// Deadline applied to each source read on its own.
    pub source_timeout: Duration,
}

impl ViewConfig {
    pub fn with_source_timeout(mut self, source_timeout: Duration) -> Self {
        self.source_timeout = source_timeout;
        self
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(8),
        }
    }
}

/// Builds [`HotelView`]s.
#[derive(Clone)]
pub struct ViewBuilder {
    gateways: Gateways,
    config: ViewConfig,
}

impl ViewBuilder {
    pub fn new(gateways: Gateways, config: ViewConfig) -> Self {
        Self { gateways, config }
    }

    /// Reads all four sources concurrently and joins them.
    ///
    /// Wall time is bounded by the slowest source, capped at
    /// `source_timeout`. A failing source empties only its own section.
    #[tracing::instrument(skip(self))]
    pub async fn build(&self) -> HotelView {
        let started = Instant::now();
        let limit = self.config.source_timeout;

        let (rooms, clients, reservations, agencies) = tokio::join!(
            with_timeout(Service::Rooms, limit, self.gateways.availability.list_rooms()),
            with_timeout(Service::Clients, limit, self.gateways.identity.list_clients()),
            with_timeout(Service::Reservations, limit, self.gateways.ledger.list()),
            with_timeout(Service::Agencies, limit, self.gateways.agencies.list_agencies()),
        );

        let mut status = ServicesStatus::default();
        let rooms = degrade(Service::Rooms, rooms, &mut status);
        let clients = degrade(Service::Clients, clients, &mut status);
        let reservations = degrade(Service::Reservations, reservations, &mut status);
        let agencies = degrade(Service::Agencies, agencies, &mut status);

        let view = HotelView::assemble(rooms, clients, reservations, agencies, status);

        metrics::histogram!("view_build_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::debug!(
            rooms = view.rooms.len(),
            reservations = view.reservations.len(),
            enriched = view.enriched_reservations.len(),
            all_up = status.all_up(),
            "view built"
        );
        view
    }
}

fn degrade<T>(service: Service, result: gateways::Result<Vec<T>>, status: &mut ServicesStatus) -> Vec<T> {
    match result {
        Ok(items) => {
            status.set(service, true);
            items
        }
        Err(err) => {
            metrics::counter!("view_source_unavailable_total", "source" => service.as_str())
                .increment(1);
            tracing::warn!(source = %service, error = %err, "view source unavailable");
            Vec::new()
        }
    }
}
