//! Records served by the availability and identity services.

use common::{AgencyId, ClientId, Money, RoomId};
use serde::{Deserialize, Serialize};

/// A room as held by the availability service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    #[serde(rename = "type")]
    pub room_type: String,
    /// Nightly rate in cents.
    pub price_per_night: Money,
    pub available: bool,
    /// Optimistic concurrency token, bumped on every availability write.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub agency_id: Option<AgencyId>,
}

impl Room {
    /// Creates an available room at version 0 with no agency.
    pub fn new(id: impl Into<RoomId>, room_type: impl Into<String>, price_per_night: Money) -> Self {
        Self {
            id: id.into(),
            room_type: room_type.into(),
            price_per_night,
            available: true,
            version: 0,
            agency_id: None,
        }
    }

    /// Sets the availability flag.
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Attaches the room to an agency.
    pub fn with_agency(mut self, agency_id: impl Into<AgencyId>) -> Self {
        self.agency_id = Some(agency_id.into());
        self
    }
}

/// A client as held by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Client {
    pub fn new(
        id: impl Into<ClientId>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
        }
    }

    /// Returns "first last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A hotel agency; rooms belong to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub id: AgencyId,
    pub name: String,
    pub location: String,
}

impl Agency {
    pub fn new(id: impl Into<AgencyId>, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
        }
    }
}
