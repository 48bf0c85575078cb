//! Domain layer for the hotel booking orchestrator.
//!
//! This crate provides the records owned by the three upstream stores and the
//! rules the orchestrators enforce on top of them:
//! - [`Room`], [`Client`] and [`Agency`] as read from their services
//! - [`Reservation`] with its status state machine
//! - [`BookingRequest`] validation and fixed-point price computation

pub mod booking;
pub mod error;
pub mod reservation;
pub mod room;

pub use booking::{BookingRequest, MAX_NIGHTS, RawBookingRequest};
pub use common::{AgencyId, ClientId, Money, ReservationId, RoomId};
pub use error::{DomainError, ValidationError};
pub use reservation::{
    NewReservation, Reservation, ReservationStatus, StatusUpdate, generate_confirmation_code,
};
pub use room::{Agency, Client, Room};
