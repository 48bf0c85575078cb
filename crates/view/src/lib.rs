//! Aggregated, read-only view across all four upstream sources.
//!
//! The sources are read concurrently and each one may fail on its own: a
//! failing source leaves its section empty and is flagged in
//! [`ServicesStatus`], while the other sections are still returned.

pub mod builder;
pub mod model;

pub use builder::{ViewBuilder, ViewConfig};
pub use model::{EnrichedReservation, HotelView, ServicesStatus};
