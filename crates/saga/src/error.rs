//! Saga error types.

use std::time::Duration;

use domain::{ReservationId, RoomId, ValidationError};
use gateways::{GatewayError, Service};
use thiserror::Error;

use crate::alert::InconsistencyAlert;

/// Business rules that rejected a request without any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictReason {
    /// The room is not available, or another booking took it first.
    #[error("room {room_id} is not available")]
    RoomUnavailable { room_id: RoomId },

    /// The reservation was already cancelled.
    #[error("reservation {reservation_id} is already cancelled")]
    AlreadyCancelled { reservation_id: ReservationId },
}

/// How an upstream call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamFailure {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("{0}")]
    Error(String),
}

/// Errors returned by the orchestrators.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Bad input; nothing was called or mutated.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The target record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A business rule rejected the request; nothing was mutated.
    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    /// A dependency failed or timed out before any mutation took effect.
    /// Safe to resubmit.
    #[error("{service} service unavailable: {failure}")]
    UpstreamUnavailable {
        service: Service,
        failure: UpstreamFailure,
    },

    /// A compensating action failed; the stores have diverged.
    #[error("Inconsistent state: {0}")]
    InconsistentState(Box<InconsistencyAlert>),
}

impl SagaError {
    /// Maps a gateway failure of a call to `service`.
    pub fn upstream(service: Service, err: GatewayError) -> Self {
        let failure = match err {
            GatewayError::Timeout { after, .. } => UpstreamFailure::Timeout(after),
            other => UpstreamFailure::Error(other.to_string()),
        };
        SagaError::UpstreamUnavailable { service, failure }
    }

    /// Returns true if the caller may resubmit the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SagaError::UpstreamUnavailable { .. })
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SagaError::Validation(_) => "validation",
            SagaError::NotFound { .. } => "not_found",
            SagaError::Conflict(ConflictReason::RoomUnavailable { .. }) => "room_unavailable",
            SagaError::Conflict(ConflictReason::AlreadyCancelled { .. }) => "already_cancelled",
            SagaError::UpstreamUnavailable { .. } => "upstream_unavailable",
            SagaError::InconsistentState(_) => "inconsistent_state",
        }
    }
}

impl From<ValidationError> for SagaError {
    fn from(err: ValidationError) -> Self {
        SagaError::Validation(err.to_string())
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
