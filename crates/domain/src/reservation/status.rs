//! Reservation status state machine.

use serde::{Deserialize, Serialize};

/// The status of a reservation in the ledger.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed ──► Cancelled
///           └────────────────► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Recorded but not yet confirmed.
    #[default]
    Pending,

    /// Booking saga completed.
    Confirmed,

    /// Cancelled (terminal state).
    Cancelled,
}

impl ReservationStatus {
    /// Returns true if the reservation can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Cancelled)
    }

    /// Returns true if the reservation still holds its room.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns the status name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(ReservationStatus::default(), ReservationStatus::Pending);
    }

    #[test]
    fn test_can_cancel_from_non_terminal_statuses() {
        assert!(ReservationStatus::Pending.can_cancel());
        assert!(ReservationStatus::Confirmed.can_cancel());
        assert!(!ReservationStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_cancelled_is_terminal() {
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(!ReservationStatus::Confirmed.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(!ReservationStatus::Cancelled.is_active());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReservationStatus::Confirmed).unwrap(),
            "\"confirmed\""
        );
        let parsed: ReservationStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, ReservationStatus::Cancelled);
        assert_eq!(ReservationStatus::Pending.to_string(), "pending");
    }
}
