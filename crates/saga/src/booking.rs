//! Booking saga.

use std::sync::Arc;
use std::time::Instant;

use backon::Retryable;
use domain::{
    BookingRequest, Client, NewReservation, Reservation, ReservationStatus, Room, RoomId,
    generate_confirmation_code,
};
use gateways::{AvailabilityUpdate, GatewayError, Gateways, Service, with_timeout};

use crate::alert::{AlertSink, InconsistencyAlert};
use crate::config::SagaConfig;
use crate::error::{ConflictReason, Result, SagaError};
use crate::steps::{SAGA_BOOKING, STEP_CREATE_RESERVATION, STEP_OCCUPY_ROOM};
use crate::trace::SagaTrace;

/// Books rooms across the availability service and the reservation ledger.
///
/// Reads run concurrently; writes run strictly after all reads succeed and one
/// after the other. The room write is a compare-and-set on the version read in
/// the same run, so two concurrent bookings of one room cannot both win.
pub struct BookingOrchestrator {
    gateways: Gateways,
    config: SagaConfig,
    alerts: Arc<dyn AlertSink>,
}

impl BookingOrchestrator {
    pub fn new(gateways: Gateways, config: SagaConfig, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            gateways,
            config,
            alerts,
        }
    }

    /// Books `request.room_id` for `request.client_id`.
    ///
    /// Returns the created reservation, with `total_price` frozen at
    /// `price_per_night * nights`.
    #[tracing::instrument(
        skip(self, request),
        fields(
            saga = SAGA_BOOKING,
            client_id = %request.client_id,
            room_id = %request.room_id,
            nights = request.nights
        )
    )]
    pub async fn book(&self, request: BookingRequest) -> Result<Reservation> {
        metrics::counter!("booking_attempts_total").increment(1);
        let started = Instant::now();

        let result = self.run(request).await;

        metrics::histogram!("booking_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(reservation) => {
                metrics::counter!("booking_completed_total").increment(1);
                tracing::info!(
                    reservation_id = %reservation.id(),
                    confirmation_code = reservation.confirmation_code(),
                    total_price = %reservation.total_price(),
                    "booking confirmed"
                );
            }
            Err(err) => {
                metrics::counter!("booking_failed_total", "reason" => err.kind()).increment(1);
                tracing::warn!(error = %err, "booking failed");
            }
        }
        result
    }

    async fn run(&self, request: BookingRequest) -> Result<Reservation> {
        let (room, _client) = self.fetch(&request).await?;

        if !room.available {
            return Err(SagaError::Conflict(ConflictReason::RoomUnavailable {
                room_id: room.id,
            }));
        }

        let total_price = request.total_price(room.price_per_night)?;
        let mut trace = SagaTrace::start(SAGA_BOOKING);

        let occupied_version = self.occupy(&mut trace, &room).await?;

        let new_reservation = NewReservation {
            client_id: request.client_id,
            room_id: room.id,
            nights: request.nights,
            total_price,
            status: ReservationStatus::Confirmed,
            confirmation_code: generate_confirmation_code(),
        };
        let confirmation_code = new_reservation.confirmation_code.clone();

        let created = with_timeout(
            Service::Reservations,
            self.config.call_timeout,
            self.gateways.ledger.create(new_reservation),
        )
        .await;

        let cause = match created {
            Ok(reservation) => {
                trace.step_completed(STEP_CREATE_RESERVATION);
                trace.complete();
                return Ok(reservation);
            }
            Err(err) if !err.is_rejection() => {
                // The write may have landed; the confirmation code identifies it.
                match self.find_by_code(&confirmation_code).await {
                    Ok(Some(reservation)) => {
                        tracing::info!(
                            reservation_id = %reservation.id(),
                            error = %err,
                            "ledger create failed but the record exists"
                        );
                        trace.step_completed(STEP_CREATE_RESERVATION);
                        trace.complete();
                        return Ok(reservation);
                    }
                    Ok(None) => err,
                    Err(lookup_err) => {
                        trace.step_failed(STEP_CREATE_RESERVATION, err.to_string());
                        self.release_room(&mut trace, room.id, occupied_version)
                            .await?;
                        // Room is free again, but an orphan record may exist.
                        trace.inconsistent(format!(
                            "outcome of reservation {confirmation_code} unknown: {lookup_err}"
                        ));
                        return Err(self.escalate(&trace, STEP_CREATE_RESERVATION, room.id));
                    }
                }
            }
            Err(err) => err,
        };

        trace.step_failed(STEP_CREATE_RESERVATION, cause.to_string());
        self.release_room(&mut trace, room.id, occupied_version)
            .await?;
        Err(SagaError::upstream(Service::Reservations, cause))
    }

    /// Reads the room and the client concurrently, each under its own deadline.
    async fn fetch(&self, request: &BookingRequest) -> Result<(Room, Client)> {
        let limit = self.config.call_timeout;
        let (room, client) = tokio::join!(
            with_timeout(
                Service::Rooms,
                limit,
                self.gateways.availability.get_room(request.room_id)
            ),
            with_timeout(
                Service::Clients,
                limit,
                self.gateways.identity.get_client(request.client_id)
            ),
        );

        let room = room.map_err(|e| read_error(Service::Rooms, e))?;
        let client = client.map_err(|e| read_error(Service::Clients, e))?;
        Ok((room, client))
    }

    /// Marks the room unavailable, conditioned on the version just read.
    /// Returns the version the write produced.
    async fn occupy(&self, trace: &mut SagaTrace, room: &Room) -> Result<u64> {
        let written = with_timeout(
            Service::Rooms,
            self.config.call_timeout,
            self.gateways
                .availability
                .set_availability(room.id, AvailabilityUpdate::conditional(false, room.version)),
        )
        .await;

        match written {
            Ok(version) => {
                trace.step_completed(STEP_OCCUPY_ROOM);
                Ok(version)
            }
            Err(GatewayError::VersionConflict { .. }) => {
                trace.step_failed(STEP_OCCUPY_ROOM, "lost the room to a concurrent write");
                Err(SagaError::Conflict(ConflictReason::RoomUnavailable {
                    room_id: room.id,
                }))
            }
            Err(err @ GatewayError::Timeout { .. }) => {
                trace.step_failed(STEP_OCCUPY_ROOM, err.to_string());
                // Only our write could have produced version + 1.
                let undo = self.gateways.availability.set_availability(
                    room.id,
                    AvailabilityUpdate::conditional(true, room.version + 1),
                );
                match with_timeout(Service::Rooms, self.config.call_timeout, undo).await {
                    Ok(_) => {
                        tracing::warn!(room_id = %room.id, "occupy landed after its deadline, reverted")
                    }
                    Err(GatewayError::VersionConflict { expected, actual, .. }) => {
                        // Either the occupy never landed or someone else wrote
                        // since; a late occupy would still land after this.
                        tracing::warn!(
                            room_id = %room.id,
                            expected,
                            actual,
                            "occupy timed out and its revert found another version"
                        )
                    }
                    Err(undo_err) => {
                        trace.inconsistent(format!(
                            "occupy timed out and could not be reverted: {undo_err}"
                        ));
                        return Err(self.escalate(trace, STEP_OCCUPY_ROOM, room.id));
                    }
                }
                Err(SagaError::upstream(Service::Rooms, err))
            }
            Err(err) => {
                trace.step_failed(STEP_OCCUPY_ROOM, err.to_string());
                Err(SagaError::upstream(Service::Rooms, err))
            }
        }
    }

    /// Compensates the occupy step. Transient failures are retried with
    /// backoff; exhaustion raises an operator alert.
    async fn release_room(
        &self,
        trace: &mut SagaTrace,
        room_id: RoomId,
        occupied_version: u64,
    ) -> Result<()> {
        metrics::counter!("saga_compensations_total", "step" => STEP_OCCUPY_ROOM).increment(1);
        tracing::warn!(%room_id, "reservation not created, releasing room");

        let call_timeout = self.config.call_timeout;
        let availability = &self.gateways.availability;
        let revert = move || async move {
            with_timeout(
                Service::Rooms,
                call_timeout,
                availability.set_availability(
                    room_id,
                    AvailabilityUpdate::conditional(true, occupied_version),
                ),
            )
            .await
        };

        let reverted = revert
            .retry(self.config.retry.backoff())
            .when(|e: &GatewayError| e.is_transient())
            .notify(|err: &GatewayError, delay| {
                tracing::warn!(%room_id, error = %err, ?delay, "room release failed, retrying");
            })
            .await;

        match reverted {
            Ok(_) => {
                trace.step_compensated(STEP_OCCUPY_ROOM);
                Ok(())
            }
            Err(err) => {
                trace.inconsistent(format!("room release failed: {err}"));
                Err(self.escalate(trace, STEP_OCCUPY_ROOM, room_id))
            }
        }
    }

    async fn find_by_code(&self, code: &str) -> gateways::Result<Option<Reservation>> {
        let all = with_timeout(
            Service::Reservations,
            self.config.call_timeout,
            self.gateways.ledger.list(),
        )
        .await?;
        Ok(all.into_iter().find(|r| r.confirmation_code() == code))
    }

    fn escalate(&self, trace: &SagaTrace, step: &'static str, room_id: RoomId) -> SagaError {
        let alert = InconsistencyAlert::from_trace(trace, step, room_id, None);
        self.alerts.raise(&alert);
        SagaError::InconsistentState(Box::new(alert))
    }
}

/// A missing room or client is bad input, not an outage.
fn read_error(service: Service, err: GatewayError) -> SagaError {
    match err {
        GatewayError::NotFound { entity, id } => {
            SagaError::Validation(format!("{entity} {id} does not exist"))
        }
        other => SagaError::upstream(service, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::InMemoryAlertSink;
    use crate::config::RetryPolicy;
    use crate::error::UpstreamFailure;
    use async_trait::async_trait;
    use domain::{ClientId, Money};
    use gateways::{
        AvailabilityGateway, InMemoryAgencyDirectory, InMemoryAvailabilityGateway,
        InMemoryIdentityGateway, InMemoryReservationLedger,
    };
    use std::time::Duration;

    struct Harness {
        orchestrator: BookingOrchestrator,
        rooms: InMemoryAvailabilityGateway,
        clients: InMemoryIdentityGateway,
        ledger: InMemoryReservationLedger,
        alerts: InMemoryAlertSink,
    }

    fn setup() -> Harness {
        let rooms = InMemoryAvailabilityGateway::with_rooms([
            Room::new(12, "double", Money::from_units(100)),
            Room::new(14, "suite", Money::from_cents(12_550)).with_available(false),
        ]);
        let clients = InMemoryIdentityGateway::with_clients([Client::new(7, "Ada", "Lovelace")]);
        let ledger = InMemoryReservationLedger::new();
        let alerts = InMemoryAlertSink::new();
        let gateways =
            Gateways::in_memory(&rooms, &clients, &ledger, &InMemoryAgencyDirectory::new());
        let config = SagaConfig::default()
            .with_call_timeout(Duration::from_millis(200))
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));

        Harness {
            orchestrator: BookingOrchestrator::new(gateways, config, Arc::new(alerts.clone())),
            rooms,
            clients,
            ledger,
            alerts,
        }
    }

    fn request(room: i64, nights: u32) -> BookingRequest {
        BookingRequest::new(7, room, nights).unwrap()
    }

    #[tokio::test]
    async fn test_happy_path() {
        let h = setup();
        let reservation = h.orchestrator.book(request(12, 3)).await.unwrap();

        assert_eq!(reservation.total_price(), Money::from_units(300));
        assert_eq!(reservation.status(), ReservationStatus::Confirmed);
        assert_eq!(reservation.room_id(), Some(RoomId::new(12)));
        assert_eq!(reservation.client_id(), ClientId::new(7));
        assert!(reservation.confirmation_code().starts_with("RES-"));

        let room = h.rooms.room(RoomId::new(12)).unwrap();
        assert!(!room.available);
        assert_eq!(room.version, 1);
        assert_eq!(h.ledger.reservation_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_room_is_conflict_without_writes() {
        let h = setup();
        let result = h.orchestrator.book(request(14, 1)).await;

        assert!(matches!(
            result,
            Err(SagaError::Conflict(ConflictReason::RoomUnavailable { .. }))
        ));
        assert_eq!(h.rooms.write_count(), 0);
        assert_eq!(h.ledger.reservation_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_room_or_client_is_validation_error() {
        let h = setup();
        let result = h.orchestrator.book(request(99, 1)).await;
        assert!(
            matches!(result, Err(SagaError::Validation(ref m)) if m == "room 99 does not exist")
        );

        let unknown_client = BookingRequest::new(8, 12, 1).unwrap();
        let result = h.orchestrator.book(unknown_client).await;
        assert!(matches!(result, Err(SagaError::Validation(_))));
        assert_eq!(h.rooms.write_count(), 0);
    }

    #[tokio::test]
    async fn test_read_failure_is_upstream_unavailable() {
        let h = setup();
        h.clients.set_fail_on_read(true);

        let result = h.orchestrator.book(request(12, 1)).await;
        assert!(matches!(
            result,
            Err(SagaError::UpstreamUnavailable {
                service: Service::Clients,
                failure: UpstreamFailure::Error(_),
            })
        ));
        assert_eq!(h.rooms.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout_is_upstream_unavailable() {
        let h = setup();
        h.rooms.set_latency(Duration::from_secs(5));

        let err = h.orchestrator.book(request(12, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            SagaError::UpstreamUnavailable {
                service: Service::Rooms,
                failure: UpstreamFailure::Timeout(_),
            }
        ));
        assert!(err.is_retryable());
        assert_eq!(h.ledger.reservation_count(), 0);
    }

    #[tokio::test]
    async fn test_occupy_failure_needs_no_compensation() {
        let h = setup();
        h.rooms.set_fail_on_occupy(true);

        let result = h.orchestrator.book(request(12, 1)).await;
        assert!(matches!(
            result,
            Err(SagaError::UpstreamUnavailable {
                service: Service::Rooms,
                ..
            })
        ));
        assert!(h.rooms.room(RoomId::new(12)).unwrap().available);
        assert_eq!(h.ledger.reservation_count(), 0);
    }

    #[tokio::test]
    async fn test_ledger_failure_releases_room() {
        let h = setup();
        h.ledger.set_fail_on_create(true);

        let result = h.orchestrator.book(request(12, 2)).await;
        assert!(matches!(
            result,
            Err(SagaError::UpstreamUnavailable {
                service: Service::Reservations,
                ..
            })
        ));

        let room = h.rooms.room(RoomId::new(12)).unwrap();
        assert!(room.available);
        assert_eq!(room.version, 2);
        assert_eq!(h.alerts.alert_count(), 0);
    }

    #[tokio::test]
    async fn test_release_is_retried() {
        let h = setup();
        h.ledger.set_fail_on_create(true);
        h.rooms.fail_next_releases(2);

        let result = h.orchestrator.book(request(12, 1)).await;
        assert!(matches!(result, Err(SagaError::UpstreamUnavailable { .. })));
        assert!(h.rooms.room(RoomId::new(12)).unwrap().available);
        assert_eq!(h.alerts.alert_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_compensation_escalates() {
        let h = setup();
        h.ledger.set_fail_on_create(true);
        h.rooms.set_fail_on_release(true);

        let result = h.orchestrator.book(request(12, 1)).await;
        let Err(SagaError::InconsistentState(alert)) = result else {
            panic!("expected InconsistentState, got {result:?}");
        };
        assert_eq!(alert.saga, SAGA_BOOKING);
        assert_eq!(alert.step, STEP_OCCUPY_ROOM);
        assert_eq!(alert.room_id, RoomId::new(12));
        assert_eq!(alert.completed_steps, vec![STEP_OCCUPY_ROOM]);

        assert_eq!(h.alerts.alert_count(), 1);
        assert!(!h.rooms.room(RoomId::new(12)).unwrap().available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ledger_timeout_after_commit_is_success() {
        let h = setup();
        h.ledger.set_create_ack_delay(Duration::from_secs(5));

        let reservation = h.orchestrator.book(request(12, 2)).await.unwrap();
        assert_eq!(h.ledger.reservation_count(), 1);
        assert_eq!(reservation.total_price(), Money::from_units(200));
        assert!(!h.rooms.room(RoomId::new(12)).unwrap().available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ledger_timeout_with_unknown_outcome_escalates() {
        let h = setup();
        h.ledger.set_latency(Duration::from_millis(300));

        // create times out before writing and the lookup times out as well
        let result = h.orchestrator.book(request(12, 1)).await;
        assert!(matches!(result, Err(SagaError::InconsistentState(_))));
        assert_eq!(h.ledger.reservation_count(), 0);
        assert!(h.rooms.room(RoomId::new(12)).unwrap().available);
        assert_eq!(h.alerts.alerts()[0].step, STEP_CREATE_RESERVATION);
    }

    #[tokio::test]
    async fn test_undecodable_create_reply_is_reconciled_by_code() {
        let h = setup();
        h.ledger.set_garbled_create_ack(true);

        let reservation = h.orchestrator.book(request(12, 2)).await.unwrap();
        assert_eq!(h.ledger.reservation_count(), 1);
        assert_eq!(
            h.ledger.reservations_for_room(RoomId::new(12))[0].id(),
            reservation.id()
        );
        // the confirmed record keeps its room
        assert!(!h.rooms.room(RoomId::new(12)).unwrap().available);
        assert_eq!(h.alerts.alert_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_create_is_compensated_without_lookup() {
        let h = setup();
        h.ledger.set_reject_creates(true);
        // a lookup would fail and escalate; a refusal must not need one
        h.ledger.set_fail_on_read(true);

        let result = h.orchestrator.book(request(12, 1)).await;
        assert!(matches!(
            result,
            Err(SagaError::UpstreamUnavailable {
                service: Service::Reservations,
                failure: UpstreamFailure::Error(_),
            })
        ));
        assert!(h.rooms.room(RoomId::new(12)).unwrap().available);
        assert_eq!(h.alerts.alert_count(), 0);
    }

    /// Occupy writes hang without ever landing; every other call passes through.
    struct StalledOccupy(InMemoryAvailabilityGateway);

    #[async_trait]
    impl AvailabilityGateway for StalledOccupy {
        async fn list_rooms(&self) -> gateways::Result<Vec<Room>> {
            self.0.list_rooms().await
        }

        async fn get_room(&self, room_id: RoomId) -> gateways::Result<Room> {
            self.0.get_room(room_id).await
        }

        async fn set_availability(
            &self,
            room_id: RoomId,
            update: AvailabilityUpdate,
        ) -> gateways::Result<u64> {
            if !update.available {
                std::future::pending::<()>().await;
            }
            self.0.set_availability(room_id, update).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_occupy_timeout_whose_revert_finds_no_write_is_not_escalated() {
        let h = setup();
        let gateways = Gateways::new(
            Arc::new(StalledOccupy(h.rooms.clone())),
            Arc::new(h.clients.clone()),
            Arc::new(h.ledger.clone()),
            Arc::new(InMemoryAgencyDirectory::new()),
        );
        let orchestrator = BookingOrchestrator::new(
            gateways,
            SagaConfig::default().with_call_timeout(Duration::from_millis(200)),
            Arc::new(h.alerts.clone()),
        );

        let err = orchestrator.book(request(12, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            SagaError::UpstreamUnavailable {
                service: Service::Rooms,
                failure: UpstreamFailure::Timeout(_),
            }
        ));
        // the revert lost its compare-and-set against the untouched version
        let room = h.rooms.room(RoomId::new(12)).unwrap();
        assert!(room.available);
        assert_eq!(room.version, 0);
        assert_eq!(h.alerts.alert_count(), 0);
        assert_eq!(h.ledger.reservation_count(), 0);
    }
}
