use serde::{Deserialize, Serialize};

/// The upstream services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Rooms,
    Clients,
    Reservations,
    Agencies,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Rooms => "rooms",
            Service::Clients => "clients",
            Service::Reservations => "reservations",
            Service::Agencies => "agencies",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
