//! Saga and step names.

/// The booking saga.
pub const SAGA_BOOKING: &str = "booking";

/// The cancellation saga.
pub const SAGA_CANCELLATION: &str = "cancellation";

/// Step name: mark the room unavailable.
pub const STEP_OCCUPY_ROOM: &str = "occupy_room";

/// Step name: create the reservation record.
pub const STEP_CREATE_RESERVATION: &str = "create_reservation";

/// Step name: transition the reservation to cancelled.
pub const STEP_CANCEL_RESERVATION: &str = "cancel_reservation";

/// Step name: mark the room available again.
pub const STEP_RELEASE_ROOM: &str = "release_room";
