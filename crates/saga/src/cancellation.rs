//! Cancellation saga.

use std::sync::Arc;
use std::time::Instant;

use backon::Retryable;
use chrono::Utc;
use domain::{Reservation, ReservationId, ReservationStatus, RoomId, StatusUpdate};
use gateways::{AvailabilityUpdate, GatewayError, Gateways, Service, with_timeout};

use crate::alert::{AlertSink, InconsistencyAlert};
use crate::config::SagaConfig;
use crate::error::{ConflictReason, Result, SagaError};
use crate::steps::{SAGA_CANCELLATION, STEP_CANCEL_RESERVATION, STEP_RELEASE_ROOM};
use crate::trace::SagaTrace;

/// Cancels reservations and gives their rooms back.
///
/// The ledger transition is conditioned on the current status, so a repeated
/// cancel mutates nothing and reports `AlreadyCancelled`.
pub struct CancellationOrchestrator {
    gateways: Gateways,
    config: SagaConfig,
    alerts: Arc<dyn AlertSink>,
}

impl CancellationOrchestrator {
    pub fn new(gateways: Gateways, config: SagaConfig, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            gateways,
            config,
            alerts,
        }
    }

    /// Cancels `reservation_id` and releases its room.
    #[tracing::instrument(
        skip(self, reservation_id),
        fields(saga = SAGA_CANCELLATION, reservation_id = %reservation_id)
    )]
    pub async fn cancel(&self, reservation_id: &ReservationId) -> Result<Reservation> {
        metrics::counter!("cancellation_attempts_total").increment(1);
        let started = Instant::now();

        let result = self.run(reservation_id).await;

        metrics::histogram!("cancellation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(reservation) => {
                metrics::counter!("cancellation_completed_total").increment(1);
                tracing::info!(room_id = ?reservation.room_id(), "reservation cancelled");
            }
            Err(err) => {
                metrics::counter!("cancellation_failed_total", "reason" => err.kind())
                    .increment(1);
                tracing::warn!(error = %err, "cancellation failed");
            }
        }
        result
    }

    async fn run(&self, reservation_id: &ReservationId) -> Result<Reservation> {
        let limit = self.config.call_timeout;

        let reservation = with_timeout(
            Service::Reservations,
            limit,
            self.gateways.ledger.get(reservation_id),
        )
        .await
        .map_err(|err| match err {
            GatewayError::NotFound { entity, id } => SagaError::NotFound { entity, id },
            other => SagaError::upstream(Service::Reservations, other),
        })?;

        if reservation.status() == ReservationStatus::Cancelled {
            return Err(already_cancelled(reservation_id));
        }

        // Resolved before anything is mutated: a reservation whose room is
        // unknown is never transitioned.
        let room_id = self.resolve_room(&reservation).await?;

        let mut trace = SagaTrace::start(SAGA_CANCELLATION);
        let cancelled = with_timeout(
            Service::Reservations,
            limit,
            self.gateways
                .ledger
                .update_status(reservation_id, StatusUpdate::cancel(Utc::now())),
        )
        .await;

        let cancelled = match cancelled {
            Ok(cancelled) => cancelled,
            Err(GatewayError::StatusConflict { .. }) => {
                trace.step_failed(STEP_CANCEL_RESERVATION, "status changed concurrently");
                return Err(already_cancelled(reservation_id));
            }
            Err(GatewayError::NotFound { entity, id }) => {
                return Err(SagaError::NotFound { entity, id });
            }
            Err(err) if err.is_rejection() => {
                trace.step_failed(STEP_CANCEL_RESERVATION, err.to_string());
                return Err(SagaError::upstream(Service::Reservations, err));
            }
            Err(err) => {
                // The transition may have landed before the reply was lost.
                let current = with_timeout(
                    Service::Reservations,
                    limit,
                    self.gateways.ledger.get(reservation_id),
                )
                .await;
                match current {
                    Ok(current) if current.status() == ReservationStatus::Cancelled => {
                        tracing::info!(
                            error = %err,
                            "status update failed but the reservation is cancelled"
                        );
                        current
                    }
                    Ok(_) => {
                        trace.step_failed(STEP_CANCEL_RESERVATION, err.to_string());
                        return Err(SagaError::upstream(Service::Reservations, err));
                    }
                    Err(lookup_err) => {
                        trace.step_failed(STEP_CANCEL_RESERVATION, err.to_string());
                        trace.inconsistent(format!(
                            "outcome of cancelling {reservation_id} unknown: {lookup_err}"
                        ));
                        return Err(self.escalate(
                            &trace,
                            STEP_CANCEL_RESERVATION,
                            room_id,
                            reservation_id,
                        ));
                    }
                }
            }
        };
        trace.step_completed(STEP_CANCEL_RESERVATION);

        match self.release(room_id).await {
            Ok(()) => {
                trace.step_completed(STEP_RELEASE_ROOM);
                trace.complete();
                Ok(cancelled)
            }
            Err(err) => {
                trace.step_failed(STEP_RELEASE_ROOM, err.to_string());
                trace.inconsistent(format!(
                    "reservation cancelled but room release failed: {err}"
                ));
                Err(self.escalate(&trace, STEP_RELEASE_ROOM, room_id, reservation_id))
            }
        }
    }

    fn escalate(
        &self,
        trace: &SagaTrace,
        step: &'static str,
        room_id: RoomId,
        reservation_id: &ReservationId,
    ) -> SagaError {
        let alert =
            InconsistencyAlert::from_trace(trace, step, room_id, Some(reservation_id.clone()));
        self.alerts.raise(&alert);
        SagaError::InconsistentState(Box::new(alert))
    }

    /// Returns the room a reservation holds.
    ///
    /// Older ledger records come back from `get` without the room; those are
    /// looked up in the full listing.
    async fn resolve_room(&self, reservation: &Reservation) -> Result<RoomId> {
        if let Some(room_id) = reservation.room_id() {
            return Ok(room_id);
        }

        tracing::debug!("room id missing from record, scanning ledger");
        let all = with_timeout(
            Service::Reservations,
            self.config.call_timeout,
            self.gateways.ledger.list(),
        )
        .await
        .map_err(|err| SagaError::upstream(Service::Reservations, err))?;

        all.iter()
            .find(|r| r.id() == reservation.id())
            .and_then(Reservation::room_id)
            .ok_or_else(|| SagaError::NotFound {
                entity: "room for reservation",
                id: reservation.id().to_string(),
            })
    }

    /// Marks the room available, retrying transient failures and lost races.
    ///
    /// Each attempt re-reads the room so the write is conditioned on its
    /// current version. A room that is already available counts as released.
    async fn release(&self, room_id: RoomId) -> gateways::Result<()> {
        let limit = self.config.call_timeout;
        let availability = &self.gateways.availability;

        let attempt = move || async move {
            let room = with_timeout(Service::Rooms, limit, availability.get_room(room_id)).await?;
            if room.available {
                return Ok(());
            }
            with_timeout(
                Service::Rooms,
                limit,
                availability
                    .set_availability(room_id, AvailabilityUpdate::conditional(true, room.version)),
            )
            .await
            .map(|_| ())
        };

        attempt
            .retry(self.config.retry.backoff())
            .when(|e: &GatewayError| {
                e.is_transient() || matches!(e, GatewayError::VersionConflict { .. })
            })
            .notify(|err: &GatewayError, delay| {
                tracing::warn!(%room_id, error = %err, ?delay, "room release failed, retrying");
            })
            .await
    }
}

fn already_cancelled(reservation_id: &ReservationId) -> SagaError {
    SagaError::Conflict(ConflictReason::AlreadyCancelled {
        reservation_id: reservation_id.clone(),
    })
}
