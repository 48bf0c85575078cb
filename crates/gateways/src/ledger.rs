//! Reservation ledger trait and in-memory implementation.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use domain::{NewReservation, Reservation, ReservationId, RoomId, StatusUpdate};

use crate::error::{GatewayError, Result};
use crate::service::Service;

/// Trait for the reservation ledger service.
#[async_trait]
pub trait ReservationLedger: Send + Sync {
    /// Creates a reservation; the ledger assigns its id and creation time.
    async fn create(&self, reservation: NewReservation) -> Result<Reservation>;

    /// Lists every reservation, cancelled ones included.
    async fn list(&self) -> Result<Vec<Reservation>>;

    /// Fetches one reservation; `NotFound` if absent.
    async fn get(&self, reservation_id: &ReservationId) -> Result<Reservation>;

    /// Conditionally transitions a reservation's status.
    ///
    /// Fails with `StatusConflict` if the current status does not allow the
    /// transition.
    async fn update_status(
        &self,
        reservation_id: &ReservationId,
        update: StatusUpdate,
    ) -> Result<Reservation>;
}

#[derive(Debug, Default)]
struct InMemoryLedgerState {
    reservations: Vec<Reservation>,
    fail_on_create: bool,
    fail_on_update: bool,
    fail_on_read: bool,
    legacy_reads: bool,
    update_count: usize,
    latency: Duration,
    create_ack_delay: Duration,
    garbled_create_ack: bool,
    reject_creates: bool,
    update_ack_delay: Duration,
}

/// In-memory reservation ledger for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReservationLedger {
    state: Arc<RwLock<InMemoryLedgerState>>,
}

impl InMemoryReservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record as-is.
    pub fn insert(&self, reservation: Reservation) {
        self.state.write().unwrap().reservations.push(reservation);
    }

    /// Returns a snapshot of a reservation.
    pub fn reservation(&self, reservation_id: &ReservationId) -> Option<Reservation> {
        self.state
            .read()
            .unwrap()
            .reservations
            .iter()
            .find(|r| r.id() == reservation_id)
            .cloned()
    }

    /// Returns every record for a room.
    pub fn reservations_for_room(&self, room_id: RoomId) -> Vec<Reservation> {
        self.state
            .read()
            .unwrap()
            .reservations
            .iter()
            .filter(|r| r.room_id() == Some(room_id))
            .cloned()
            .collect()
    }

    /// Returns the number of stored records.
    pub fn reservation_count(&self) -> usize {
        self.state.read().unwrap().reservations.len()
    }

    /// Returns the number of applied status updates.
    pub fn update_count(&self) -> usize {
        self.state.read().unwrap().update_count
    }

    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    pub fn set_fail_on_update(&self, fail: bool) {
        self.state.write().unwrap().fail_on_update = fail;
    }

    pub fn set_fail_on_read(&self, fail: bool) {
        self.state.write().unwrap().fail_on_read = fail;
    }

    /// Makes `get` answer like the older ledger API, without the embedded
    /// room id. `list` still returns full records.
    pub fn set_legacy_reads(&self, legacy: bool) {
        self.state.write().unwrap().legacy_reads = legacy;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.write().unwrap().latency = latency;
    }

    /// Delays the reply to `create` after the record is stored, like a ledger
    /// that commits and then answers slowly.
    pub fn set_create_ack_delay(&self, delay: Duration) {
        self.state.write().unwrap().create_ack_delay = delay;
    }

    /// Stores created records but answers with an undecodable reply.
    pub fn set_garbled_create_ack(&self, garbled: bool) {
        self.state.write().unwrap().garbled_create_ack = garbled;
    }

    /// Refuses creates the way a ledger answering `4xx` does, storing nothing.
    pub fn set_reject_creates(&self, reject: bool) {
        self.state.write().unwrap().reject_creates = reject;
    }

    /// Delays the reply to `update_status` after the transition is applied.
    pub fn set_update_ack_delay(&self, delay: Duration) {
        self.state.write().unwrap().update_ack_delay = delay;
    }

    async fn simulate_latency(&self) {
        let latency = self.state.read().unwrap().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ReservationLedger for InMemoryReservationLedger {
    async fn create(&self, reservation: NewReservation) -> Result<Reservation> {
        self.simulate_latency().await;
        let (record, ack_delay, garbled) = {
            let mut state = self.state.write().unwrap();
            if state.fail_on_create {
                return Err(GatewayError::unavailable(Service::Reservations, "insert failed"));
            }
            if state.reject_creates {
                return Err(GatewayError::Rejected {
                    service: Service::Reservations,
                    reason: "HTTP 422 - client is blocked".to_string(),
                });
            }

            let id = ReservationId::new(uuid::Uuid::new_v4().simple().to_string());
            let record = Reservation::create(id, reservation, Utc::now());
            state.reservations.push(record.clone());
            (record, state.create_ack_delay, state.garbled_create_ack)
        };
        if !ack_delay.is_zero() {
            tokio::time::sleep(ack_delay).await;
        }
        if garbled {
            return Err(GatewayError::InvalidPayload {
                service: Service::Reservations,
                reason: "expected value at line 1 column 1".to_string(),
            });
        }
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<Reservation>> {
        self.simulate_latency().await;
        let state = self.state.read().unwrap();
        if state.fail_on_read {
            return Err(GatewayError::unavailable(Service::Reservations, "connection refused"));
        }
        Ok(state.reservations.clone())
    }

    async fn get(&self, reservation_id: &ReservationId) -> Result<Reservation> {
        self.simulate_latency().await;
        let state = self.state.read().unwrap();
        if state.fail_on_read {
            return Err(GatewayError::unavailable(Service::Reservations, "connection refused"));
        }
        let record = state
            .reservations
            .iter()
            .find(|r| r.id() == reservation_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("reservation", reservation_id))?;

        if state.legacy_reads {
            Ok(record.without_room())
        } else {
            Ok(record)
        }
    }

    async fn update_status(
        &self,
        reservation_id: &ReservationId,
        update: StatusUpdate,
    ) -> Result<Reservation> {
        self.simulate_latency().await;
        let (updated, ack_delay) = {
            let mut state = self.state.write().unwrap();
            if state.fail_on_update {
                return Err(GatewayError::unavailable(Service::Reservations, "update failed"));
            }

            let record = state
                .reservations
                .iter_mut()
                .find(|r| r.id() == reservation_id)
                .ok_or_else(|| GatewayError::not_found("reservation", reservation_id))?;

            record
                .apply_status(&update)
                .map_err(|_| GatewayError::StatusConflict {
                    reservation_id: reservation_id.to_string(),
                    current: record.status(),
                })?;
            let updated = record.clone();
            state.update_count += 1;
            (updated, state.update_ack_delay)
        };
        if !ack_delay.is_zero() {
            tokio::time::sleep(ack_delay).await;
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ClientId, Money, ReservationStatus};

    fn new_reservation() -> NewReservation {
        NewReservation {
            client_id: ClientId::new(7),
            room_id: RoomId::new(12),
            nights: 3,
            total_price: Money::from_units(300),
            status: ReservationStatus::Confirmed,
            confirmation_code: "RES-0000AAAA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let ledger = InMemoryReservationLedger::new();
        let r1 = ledger.create(new_reservation()).await.unwrap();
        let r2 = ledger.create(new_reservation()).await.unwrap();

        assert_ne!(r1.id(), r2.id());
        assert_eq!(ledger.reservation_count(), 2);
        assert_eq!(ledger.get(r1.id()).await.unwrap(), r1);
    }

    #[tokio::test]
    async fn test_update_status_is_conditioned() {
        let ledger = InMemoryReservationLedger::new();
        let r = ledger.create(new_reservation()).await.unwrap();

        let cancelled = ledger
            .update_status(r.id(), StatusUpdate::cancel(Utc::now()))
            .await
            .unwrap();
        assert_eq!(cancelled.status(), ReservationStatus::Cancelled);
        assert!(cancelled.cancelled_at().is_some());

        let again = ledger
            .update_status(r.id(), StatusUpdate::cancel(Utc::now()))
            .await;
        assert!(matches!(
            again,
            Err(GatewayError::StatusConflict {
                current: ReservationStatus::Cancelled,
                ..
            })
        ));
        assert_eq!(ledger.update_count(), 1);
    }

    #[tokio::test]
    async fn test_legacy_reads_drop_room_from_get_only() {
        let ledger = InMemoryReservationLedger::new();
        let r = ledger.create(new_reservation()).await.unwrap();
        ledger.set_legacy_reads(true);

        assert_eq!(ledger.get(r.id()).await.unwrap().room_id(), None);
        assert_eq!(ledger.list().await.unwrap()[0].room_id(), Some(RoomId::new(12)));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let ledger = InMemoryReservationLedger::new();
        ledger.set_fail_on_create(true);
        assert!(ledger.create(new_reservation()).await.is_err());
        assert_eq!(ledger.reservation_count(), 0);

        ledger.set_fail_on_read(true);
        assert!(ledger.list().await.is_err());
    }

    #[tokio::test]
    async fn test_garbled_ack_still_stores_the_record() {
        let ledger = InMemoryReservationLedger::new();
        ledger.set_garbled_create_ack(true);

        let err = ledger.create(new_reservation()).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidPayload { .. }));
        assert!(!err.is_rejection());
        assert_eq!(ledger.reservation_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_create_stores_nothing() {
        let ledger = InMemoryReservationLedger::new();
        ledger.set_reject_creates(true);

        let err = ledger.create(new_reservation()).await.unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(ledger.reservation_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_ack_delay_applies_before_replying() {
        let ledger = InMemoryReservationLedger::new();
        let r = ledger.create(new_reservation()).await.unwrap();
        ledger.set_update_ack_delay(Duration::from_secs(5));

        let update = ledger.update_status(r.id(), StatusUpdate::cancel(Utc::now()));
        let timed_out = tokio::time::timeout(Duration::from_millis(100), update).await;
        assert!(timed_out.is_err());
        assert_eq!(
            ledger.reservation(r.id()).unwrap().status(),
            ReservationStatus::Cancelled
        );
    }
}
