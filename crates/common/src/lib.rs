//! Shared types for the hotel booking orchestrator.
//!
//! Identifiers are newtypes so a room id can never be passed where a client
//! id is expected, and [`Money`] keeps every price in integer cents.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{AgencyId, ClientId, ReservationId, RoomId};
