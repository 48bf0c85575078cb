//! Client interfaces for the upstream services the orchestrators coordinate.
//!
//! Each service gets a trait with two implementations:
//! - an in-memory one with failure and latency injection, used by tests and
//!   local runs
//! - an HTTP one over `reqwest`, used against the real services
//!
//! [`Gateways`] bundles one handle per service. It is built once at start-up
//! and passed explicitly to every orchestrator; nothing here is global.

pub mod agencies;
pub mod availability;
pub mod error;
pub mod http;
pub mod identity;
pub mod ledger;
pub mod service;
pub mod timeout;

use std::sync::Arc;

pub use agencies::{AgencyDirectory, InMemoryAgencyDirectory};
pub use availability::{AvailabilityGateway, AvailabilityUpdate, InMemoryAvailabilityGateway};
pub use error::{GatewayError, Result};
pub use http::{
    HttpAgencyDirectory, HttpAvailabilityGateway, HttpConfig, HttpIdentityGateway,
    HttpReservationLedger,
};
pub use identity::{IdentityGateway, InMemoryIdentityGateway};
pub use ledger::{InMemoryReservationLedger, ReservationLedger};
pub use service::Service;
pub use timeout::with_timeout;

/// One handle per upstream service.
#[derive(Clone)]
pub struct Gateways {
    pub availability: Arc<dyn AvailabilityGateway>,
    pub identity: Arc<dyn IdentityGateway>,
    pub ledger: Arc<dyn ReservationLedger>,
    pub agencies: Arc<dyn AgencyDirectory>,
}

impl Gateways {
    pub fn new(
        availability: Arc<dyn AvailabilityGateway>,
        identity: Arc<dyn IdentityGateway>,
        ledger: Arc<dyn ReservationLedger>,
        agencies: Arc<dyn AgencyDirectory>,
    ) -> Self {
        Self {
            availability,
            identity,
            ledger,
            agencies,
        }
    }

    /// Bundles in-memory gateways. The arguments are cheap clones sharing
    /// state, so callers keep their copies for seeding and assertions.
    pub fn in_memory(
        availability: &InMemoryAvailabilityGateway,
        identity: &InMemoryIdentityGateway,
        ledger: &InMemoryReservationLedger,
        agencies: &InMemoryAgencyDirectory,
    ) -> Self {
        Self::new(
            Arc::new(availability.clone()),
            Arc::new(identity.clone()),
            Arc::new(ledger.clone()),
            Arc::new(agencies.clone()),
        )
    }

    /// HTTP gateways against the four service base URLs.
    pub fn http(
        rooms: HttpConfig,
        clients: HttpConfig,
        reservations: HttpConfig,
        agencies: HttpConfig,
    ) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpAvailabilityGateway::new(rooms)?),
            Arc::new(HttpIdentityGateway::new(clients)?),
            Arc::new(HttpReservationLedger::new(reservations)?),
            Arc::new(HttpAgencyDirectory::new(agencies)?),
        ))
    }
}
