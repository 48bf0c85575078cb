//! Operator alert path for diverged stores.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use domain::{ReservationId, RoomId};
use serde::Serialize;

use crate::state::SagaState;
use crate::trace::SagaTrace;

/// Everything an operator needs to reconcile a diverged saga by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InconsistencyAlert {
    pub saga: &'static str,
    /// Where the run stopped.
    pub state: SagaState,
    /// The forward step whose failure started the run's recovery.
    pub failed_step: Option<&'static str>,
    /// The compensating or follow-up step that could not complete.
    pub step: &'static str,
    pub room_id: RoomId,
    pub reservation_id: Option<ReservationId>,
    /// Steps that took effect and were not undone.
    pub completed_steps: Vec<&'static str>,
    pub reason: String,
    pub raised_at: DateTime<Utc>,
}

impl InconsistencyAlert {
    /// Builds an alert from a trace that ended `Inconsistent`.
    pub fn from_trace(
        trace: &SagaTrace,
        step: &'static str,
        room_id: RoomId,
        reservation_id: Option<ReservationId>,
    ) -> Self {
        Self {
            saga: trace.saga(),
            state: trace.state(),
            failed_step: trace.failed_step(),
            step,
            room_id,
            reservation_id,
            completed_steps: trace.completed_steps().to_vec(),
            reason: trace.failure_reason().unwrap_or("unknown").to_string(),
            raised_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for InconsistencyAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} saga could not {} for room {}",
            self.saga, self.step, self.room_id
        )?;
        if let Some(reservation_id) = &self.reservation_id {
            write!(f, " (reservation {reservation_id})")?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Destination for inconsistency alerts.
pub trait AlertSink: Send + Sync {
    fn raise(&self, alert: &InconsistencyAlert);
}

/// Logs alerts at error level on the `operator_alert` target and counts them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn raise(&self, alert: &InconsistencyAlert) {
        metrics::counter!("saga_inconsistent_state_total", "saga" => alert.saga).increment(1);
        tracing::error!(
            target: "operator_alert",
            saga = alert.saga,
            state = %alert.state,
            failed_step = alert.failed_step,
            step = alert.step,
            room_id = %alert.room_id,
            reservation_id = alert.reservation_id.as_ref().map(|id| id.as_str()),
            completed_steps = ?alert.completed_steps,
            reason = %alert.reason,
            "stores diverged, manual reconciliation required"
        );
    }
}

/// Records alerts for inspection in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAlertSink {
    alerts: Arc<RwLock<Vec<InconsistencyAlert>>>,
}

impl InMemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<InconsistencyAlert> {
        self.alerts.read().unwrap().clone()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.read().unwrap().len()
    }
}

impl AlertSink for InMemoryAlertSink {
    fn raise(&self, alert: &InconsistencyAlert) {
        TracingAlertSink.raise(alert);
        self.alerts.write().unwrap().push(alert.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{SAGA_CANCELLATION, STEP_CANCEL_RESERVATION, STEP_RELEASE_ROOM};

    #[test]
    fn test_alert_from_trace() {
        let mut trace = SagaTrace::start(SAGA_CANCELLATION);
        trace.step_completed(STEP_CANCEL_RESERVATION);
        trace.step_failed(STEP_RELEASE_ROOM, "rooms down");
        trace.inconsistent("release failed after 3 attempts");

        let alert = InconsistencyAlert::from_trace(
            &trace,
            STEP_RELEASE_ROOM,
            RoomId::new(12),
            Some(ReservationId::new("abc")),
        );
        assert_eq!(alert.completed_steps, vec![STEP_CANCEL_RESERVATION]);
        assert_eq!(alert.state, SagaState::Inconsistent);
        assert_eq!(alert.failed_step, Some(STEP_RELEASE_ROOM));
        assert_eq!(
            alert.to_string(),
            "cancellation saga could not release_room for room 12 (reservation abc): \
             release failed after 3 attempts"
        );
    }

    #[test]
    fn test_in_memory_sink_records() {
        let sink = InMemoryAlertSink::new();
        let trace = SagaTrace::start(SAGA_CANCELLATION);
        sink.raise(&InconsistencyAlert::from_trace(
            &trace,
            STEP_RELEASE_ROOM,
            RoomId::new(1),
            None,
        ));
        assert_eq!(sink.alert_count(), 1);
        assert_eq!(sink.alerts()[0].reservation_id, None);
    }
}
