//! Booking and cancellation sagas.
//!
//! The room inventory, client directory and reservation ledger share no
//! transaction boundary, so each workflow is a saga with a compensating action
//! per mutation.
//!
//! Booking:
//! 1. Read the room and the client concurrently
//! 2. Check availability and compute the fixed-point total
//! 3. Occupy the room (compare-and-set on the room version)
//! 4. Create the reservation in the ledger
//!
//! If step 4 fails the room is released again. Cancellation transitions the
//! reservation to `cancelled` and then releases its room, retrying the release
//! with exponential backoff. Any compensation that cannot complete is raised
//! as [`SagaError::InconsistentState`] and sent to the [`AlertSink`].

pub mod alert;
pub mod booking;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod state;
pub mod steps;
pub mod trace;

pub use alert::{AlertSink, InMemoryAlertSink, InconsistencyAlert, TracingAlertSink};
pub use booking::BookingOrchestrator;
pub use cancellation::CancellationOrchestrator;
pub use config::{RetryPolicy, SagaConfig};
pub use error::{ConflictReason, Result, SagaError, UpstreamFailure};
pub use state::SagaState;
pub use trace::SagaTrace;
