//! HTTP handlers.

pub mod booking;
pub mod health;
pub mod metrics;
pub mod view;
