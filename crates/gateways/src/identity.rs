//! Identity gateway trait and in-memory implementation.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::{Client, ClientId};

use crate::error::{GatewayError, Result};
use crate::service::Service;

/// Trait for the client directory service.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Lists every client.
    async fn list_clients(&self) -> Result<Vec<Client>>;

    /// Fetches one client; `NotFound` if absent.
    async fn get_client(&self, client_id: ClientId) -> Result<Client>;
}

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    clients: BTreeMap<ClientId, Client>,
    fail_on_read: bool,
    latency: Duration,
}

/// In-memory client directory for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityGateway {
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentityGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory holding `clients`.
    pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let gateway = Self::new();
        for client in clients {
            gateway.insert(client);
        }
        gateway
    }

    pub fn insert(&self, client: Client) {
        self.state.write().unwrap().clients.insert(client.id, client);
    }

    /// Configures every read to fail.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.state.write().unwrap().fail_on_read = fail;
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.write().unwrap().latency = latency;
    }

    async fn simulate_latency(&self) {
        let latency = self.state.read().unwrap().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl IdentityGateway for InMemoryIdentityGateway {
    async fn list_clients(&self) -> Result<Vec<Client>> {
        self.simulate_latency().await;
        let state = self.state.read().unwrap();
        if state.fail_on_read {
            return Err(GatewayError::unavailable(Service::Clients, "connection refused"));
        }
        Ok(state.clients.values().cloned().collect())
    }

    async fn get_client(&self, client_id: ClientId) -> Result<Client> {
        self.simulate_latency().await;
        let state = self.state.read().unwrap();
        if state.fail_on_read {
            return Err(GatewayError::unavailable(Service::Clients, "connection refused"));
        }
        state
            .clients
            .get(&client_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("client", client_id))
    }
}
