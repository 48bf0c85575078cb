//! Gateway error types.

use std::time::Duration;

use domain::ReservationStatus;
use thiserror::Error;

use crate::service::Service;

/// Errors returned by gateway calls.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The requested record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A conditional room write lost against a newer version.
    #[error("room {room_id} version conflict: expected {expected}, actual {actual}")]
    VersionConflict {
        room_id: String,
        expected: u64,
        actual: u64,
    },

    /// A conditional status update found the reservation in a status that
    /// does not allow it.
    #[error("reservation {reservation_id} is {current}")]
    StatusConflict {
        reservation_id: String,
        current: ReservationStatus,
    },

    /// The call did not complete in time.
    #[error("{service} service timed out after {}ms", after.as_millis())]
    Timeout { service: Service, after: Duration },

    /// The service could not be reached or answered with an error.
    #[error("{service} service unavailable: {reason}")]
    Unavailable { service: Service, reason: String },

    /// The service refused the request with a client error status, so it
    /// applied nothing.
    #[error("{service} service rejected the request: {reason}")]
    Rejected { service: Service, reason: String },

    /// The service answered with a body that could not be decoded.
    #[error("{service} service returned an invalid payload: {reason}")]
    InvalidPayload { service: Service, reason: String },
}

impl GatewayError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        GatewayError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn unavailable(service: Service, reason: impl Into<String>) -> Self {
        GatewayError::Unavailable {
            service,
            reason: reason.into(),
        }
    }

    /// Returns true if the failure is transient and the call may be repeated.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Timeout { .. } | GatewayError::Unavailable { .. }
        )
    }

    /// Returns true if the service answered that it applied nothing.
    ///
    /// Every other error may follow a committed write: the request can land
    /// and the reply then time out, fail in transit or fail to decode.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GatewayError::NotFound { .. }
                | GatewayError::VersionConflict { .. }
                | GatewayError::StatusConflict { .. }
                | GatewayError::Rejected { .. }
        )
    }
}

/// Convenience type alias for gateway results.
pub type Result<T> = std::result::Result<T, GatewayError>;
