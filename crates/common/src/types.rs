use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw value.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw value.
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id!(
    /// Identifier of a room, owned by the availability service.
    RoomId
);

numeric_id!(
    /// Identifier of a client, owned by the identity service.
    ClientId
);

numeric_id!(
    /// Identifier of an agency (hotel location).
    AgencyId
);

/// Identifier of a reservation.
///
/// Assigned by the reservation ledger; treated as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(String);

impl ReservationId {
    /// Creates a reservation ID from a ledger-assigned string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ReservationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReservationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ReservationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&RoomId::new(12)).unwrap();
        assert_eq!(json, "12");

        let id: ClientId = serde_json::from_str("7").unwrap();
        assert_eq!(id.get(), 7);
    }

    #[test]
    fn reservation_id_is_transparent_string() {
        let id = ReservationId::new("65f0c2");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"65f0c2\"");
        assert_eq!(id.as_str(), "65f0c2");
        assert_eq!(id.to_string(), "65f0c2");
    }

    #[test]
    fn ids_of_different_kinds_keep_their_values() {
        let room = RoomId::from(3);
        let agency = AgencyId::from(3);
        assert_eq!(i64::from(room), i64::from(agency));
    }
}
