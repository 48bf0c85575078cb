//! Reservation records held by the ledger.

mod status;

pub use status::ReservationStatus;

use chrono::{DateTime, Utc};
use common::{ClientId, Money, ReservationId, RoomId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A reservation as stored in the ledger.
///
/// `total_price` is frozen when the record is created; there is no setter and
/// no status transition touches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    client_id: ClientId,
    /// Absent on records written before the room was embedded.
    #[serde(default)]
    room_id: Option<RoomId>,
    nights: u32,
    total_price: Money,
    created_at: DateTime<Utc>,
    status: ReservationStatus,
    #[serde(default)]
    cancelled_at: Option<DateTime<Utc>>,
    confirmation_code: String,
}

impl Reservation {
    /// Materializes a ledger record from a creation request.
    pub fn create(id: ReservationId, new: NewReservation, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            client_id: new.client_id,
            room_id: Some(new.room_id),
            nights: new.nights,
            total_price: new.total_price,
            created_at,
            status: new.status,
            cancelled_at: None,
            confirmation_code: new.confirmation_code,
        }
    }

    /// Returns a copy without the embedded room, as older ledger records look.
    pub fn without_room(mut self) -> Self {
        self.room_id = None;
        self
    }

    pub fn id(&self) -> &ReservationId {
        &self.id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.room_id
    }

    pub fn nights(&self) -> u32 {
        self.nights
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn confirmation_code(&self) -> &str {
        &self.confirmation_code
    }

    /// Applies a status update.
    ///
    /// Only transitions into `Cancelled` are accepted, and only from a status
    /// that allows it.
    pub fn apply_status(&mut self, update: &StatusUpdate) -> Result<(), DomainError> {
        if update.status != ReservationStatus::Cancelled || !self.status.can_cancel() {
            return Err(DomainError::InvalidStatusTransition {
                reservation_id: self.id.clone(),
                current: self.status,
                action: "transition",
            });
        }
        self.status = ReservationStatus::Cancelled;
        self.cancelled_at = Some(update.cancelled_at.unwrap_or_else(Utc::now));
        Ok(())
    }
}

/// Payload sent to the ledger to create a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    pub client_id: ClientId,
    pub room_id: RoomId,
    pub nights: u32,
    pub total_price: Money,
    pub status: ReservationStatus,
    pub confirmation_code: String,
}

/// Payload sent to the ledger to transition a reservation's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ReservationStatus,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    /// A cancellation stamped at `at`.
    pub fn cancel(at: DateTime<Utc>) -> Self {
        Self {
            status: ReservationStatus::Cancelled,
            cancelled_at: Some(at),
        }
    }
}

/// Generates a human-facing confirmation code such as `RES-9F2C41AB`.
pub fn generate_confirmation_code() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("RES-{}", hex[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_reservation() -> NewReservation {
        NewReservation {
            client_id: ClientId::new(7),
            room_id: RoomId::new(12),
            nights: 3,
            total_price: Money::from_units(300),
            status: ReservationStatus::Confirmed,
            confirmation_code: "RES-00000001".to_string(),
        }
    }

    #[test]
    fn test_create_embeds_room_and_price() {
        let r = Reservation::create(ReservationId::new("r1"), new_reservation(), Utc::now());
        assert_eq!(r.room_id(), Some(RoomId::new(12)));
        assert_eq!(r.total_price(), Money::from_units(300));
        assert_eq!(r.status(), ReservationStatus::Confirmed);
        assert_eq!(r.cancelled_at(), None);
    }

    #[test]
    fn test_cancel_stamps_time_and_keeps_price() {
        let mut r = Reservation::create(ReservationId::new("r1"), new_reservation(), Utc::now());
        let at = Utc::now();
        r.apply_status(&StatusUpdate::cancel(at)).unwrap();

        assert_eq!(r.status(), ReservationStatus::Cancelled);
        assert_eq!(r.cancelled_at(), Some(at));
        assert_eq!(r.total_price(), Money::from_units(300));
    }

    #[test]
    fn test_cancel_twice_is_rejected() {
        let mut r = Reservation::create(ReservationId::new("r1"), new_reservation(), Utc::now());
        r.apply_status(&StatusUpdate::cancel(Utc::now())).unwrap();

        let result = r.apply_status(&StatusUpdate::cancel(Utc::now()));
        assert!(matches!(
            result,
            Err(DomainError::InvalidStatusTransition {
                current: ReservationStatus::Cancelled,
                ..
            })
        ));
    }

    #[test]
    fn test_only_cancellation_is_accepted() {
        let mut r = Reservation::create(ReservationId::new("r1"), new_reservation(), Utc::now());
        let update = StatusUpdate {
            status: ReservationStatus::Pending,
            cancelled_at: None,
        };
        assert!(r.apply_status(&update).is_err());
        assert_eq!(r.status(), ReservationStatus::Confirmed);
    }

    #[test]
    fn test_legacy_record_without_room_deserializes() {
        let json = serde_json::json!({
            "id": "64b7f",
            "client_id": 7,
            "nights": 2,
            "total_price": 20000,
            "created_at": "2024-03-01T10:00:00Z",
            "status": "pending",
            "confirmation_code": "RES4821"
        });
        let r: Reservation = serde_json::from_value(json).unwrap();
        assert_eq!(r.room_id(), None);
        assert_eq!(r.status(), ReservationStatus::Pending);
    }

    #[test]
    fn test_confirmation_code_format() {
        let code = generate_confirmation_code();
        assert!(code.starts_with("RES-"));
        assert_eq!(code.len(), 12);
        assert!(code[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
