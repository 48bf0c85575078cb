//! Agency directory trait and in-memory implementation.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::Agency;

use crate::error::{GatewayError, Result};
use crate::service::Service;

/// Trait for the agency listing (served alongside the room inventory).
#[async_trait]
pub trait AgencyDirectory: Send + Sync {
    async fn list_agencies(&self) -> Result<Vec<Agency>>;
}

#[derive(Debug, Default)]
struct InMemoryAgencyState {
    agencies: Vec<Agency>,
    fail_on_read: bool,
    latency: Duration,
}

/// In-memory agency directory for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgencyDirectory {
    state: Arc<RwLock<InMemoryAgencyState>>,
}

impl InMemoryAgencyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agencies(agencies: impl IntoIterator<Item = Agency>) -> Self {
        let directory = Self::new();
        directory
            .state
            .write()
            .unwrap()
            .agencies
            .extend(agencies);
        directory
    }

    pub fn set_fail_on_read(&self, fail: bool) {
        self.state.write().unwrap().fail_on_read = fail;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.write().unwrap().latency = latency;
    }
}

#[async_trait]
impl AgencyDirectory for InMemoryAgencyDirectory {
    async fn list_agencies(&self) -> Result<Vec<Agency>> {
        let latency = self.state.read().unwrap().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let state = self.state.read().unwrap();
        if state.fail_on_read {
            return Err(GatewayError::unavailable(Service::Agencies, "connection refused"));
        }
        Ok(state.agencies.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_agencies() {
        let d = InMemoryAgencyDirectory::with_agencies([Agency::new(1, "Centre", "Lyon")]);
        assert_eq!(d.list_agencies().await.unwrap().len(), 1);

        d.set_fail_on_read(true);
        assert!(d.list_agencies().await.is_err());
    }
}
