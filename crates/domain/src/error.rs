//! Domain error types.

use common::ReservationId;
use thiserror::Error;

use crate::reservation::ReservationStatus;

/// Reasons a booking request is rejected before any upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was absent or null.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// A field was present but not usable.
    #[error("{field} is malformed: {reason}")]
    Malformed { field: &'static str, reason: String },

    /// Night count outside the accepted range.
    #[error("nights must be between 1 and {max}, got {nights}")]
    NightsOutOfRange { nights: i64, max: u32 },

    /// The computed total does not fit the fixed-point representation.
    #[error("total price overflows for {nights} nights")]
    PriceOverflow { nights: u32 },
}

/// Errors raised by domain state transitions.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The reservation is not in a state that allows the transition.
    #[error("Invalid status transition for reservation {reservation_id}: cannot {action} from {current}")]
    InvalidStatusTransition {
        reservation_id: ReservationId,
        current: ReservationStatus,
        action: &'static str,
    },
}
