//! Availability gateway trait and in-memory implementation.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::{Room, RoomId};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};
use crate::service::Service;

/// Body of an availability write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityUpdate {
    pub available: bool,
    /// When set, the write only applies if the room is still at this version.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl AvailabilityUpdate {
    /// Compare-and-set write against `version`.
    pub fn conditional(available: bool, version: u64) -> Self {
        Self {
            available,
            expected_version: Some(version),
        }
    }

    /// Last-writer-wins write.
    pub fn unconditioned(available: bool) -> Self {
        Self {
            available,
            expected_version: None,
        }
    }
}

/// Trait for the room inventory service.
#[async_trait]
pub trait AvailabilityGateway: Send + Sync {
    /// Lists every room.
    async fn list_rooms(&self) -> Result<Vec<Room>>;

    /// Fetches one room; `NotFound` if absent.
    async fn get_room(&self, room_id: RoomId) -> Result<Room>;

    /// Writes the availability flag and returns the room's new version.
    async fn set_availability(&self, room_id: RoomId, update: AvailabilityUpdate) -> Result<u64>;
}

#[derive(Debug, Default)]
struct InMemoryAvailabilityState {
    rooms: BTreeMap<RoomId, Room>,
    fail_on_read: bool,
    fail_on_occupy: bool,
    fail_on_release: bool,
    failing_writes: u32,
    failing_releases: u32,
    write_count: usize,
    latency: Duration,
}

/// In-memory room inventory for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAvailabilityGateway {
    state: Arc<RwLock<InMemoryAvailabilityState>>,
}

impl InMemoryAvailabilityGateway {
    /// Creates an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an inventory holding `rooms`.
    pub fn with_rooms(rooms: impl IntoIterator<Item = Room>) -> Self {
        let gateway = Self::new();
        for room in rooms {
            gateway.insert(room);
        }
        gateway
    }

    /// Inserts or replaces a room.
    pub fn insert(&self, room: Room) {
        self.state.write().unwrap().rooms.insert(room.id, room);
    }

    /// Returns a snapshot of a room.
    pub fn room(&self, room_id: RoomId) -> Option<Room> {
        self.state.read().unwrap().rooms.get(&room_id).cloned()
    }

    /// Configures reads (`get_room`, `list_rooms`) to fail.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.state.write().unwrap().fail_on_read = fail;
    }

    /// Configures writes that mark a room unavailable to fail.
    pub fn set_fail_on_occupy(&self, fail: bool) {
        self.state.write().unwrap().fail_on_occupy = fail;
    }

    /// Configures writes that mark a room available to fail.
    pub fn set_fail_on_release(&self, fail: bool) {
        self.state.write().unwrap().fail_on_release = fail;
    }

    /// Makes the next `count` writes fail regardless of their content.
    pub fn fail_next_writes(&self, count: u32) {
        self.state.write().unwrap().failing_writes = count;
    }

    /// Makes the next `count` writes that mark a room available fail.
    pub fn fail_next_releases(&self, count: u32) {
        self.state.write().unwrap().failing_releases = count;
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.write().unwrap().latency = latency;
    }

    /// Returns the number of writes that were applied.
    pub fn write_count(&self) -> usize {
        self.state.read().unwrap().write_count
    }

    async fn simulate_latency(&self) {
        let latency = self.state.read().unwrap().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl AvailabilityGateway for InMemoryAvailabilityGateway {
    async fn list_rooms(&self) -> Result<Vec<Room>> {
        self.simulate_latency().await;
        let state = self.state.read().unwrap();
        if state.fail_on_read {
            return Err(GatewayError::unavailable(Service::Rooms, "connection refused"));
        }
        Ok(state.rooms.values().cloned().collect())
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Room> {
        self.simulate_latency().await;
        let state = self.state.read().unwrap();
        if state.fail_on_read {
            return Err(GatewayError::unavailable(Service::Rooms, "connection refused"));
        }
        state
            .rooms
            .get(&room_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("room", room_id))
    }

    async fn set_availability(&self, room_id: RoomId, update: AvailabilityUpdate) -> Result<u64> {
        self.simulate_latency().await;
        let mut state = self.state.write().unwrap();

        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(GatewayError::unavailable(Service::Rooms, "write rejected"));
        }
        if update.available && state.failing_releases > 0 {
            state.failing_releases -= 1;
            return Err(GatewayError::unavailable(Service::Rooms, "write rejected"));
        }
        if (update.available && state.fail_on_release) || (!update.available && state.fail_on_occupy)
        {
            return Err(GatewayError::unavailable(Service::Rooms, "write rejected"));
        }

        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| GatewayError::not_found("room", room_id))?;

        if let Some(expected) = update.expected_version
            && expected != room.version
        {
            return Err(GatewayError::VersionConflict {
                room_id: room_id.to_string(),
                expected,
                actual: room.version,
            });
        }

        room.available = update.available;
        room.version += 1;
        let version = room.version;
        state.write_count += 1;

        Ok(version)
    }
}
