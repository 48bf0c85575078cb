//! Booking input validation and pricing.

use common::{ClientId, Money, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Upper bound on nights per booking.
pub const MAX_NIGHTS: u32 = 365;

/// Booking input exactly as received, before validation.
///
/// Fields are loose JSON values so that missing and malformed inputs can be
/// reported per field instead of as a single deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBookingRequest {
    #[serde(default)]
    pub client_id: Option<Value>,
    #[serde(default)]
    pub room_id: Option<Value>,
    #[serde(default)]
    pub nights: Option<Value>,
}

/// A validated booking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub client_id: ClientId,
    pub room_id: RoomId,
    pub nights: u32,
}

impl BookingRequest {
    /// Builds a request from already-typed values, checking the night count.
    pub fn new(
        client_id: impl Into<ClientId>,
        room_id: impl Into<RoomId>,
        nights: u32,
    ) -> Result<Self, ValidationError> {
        check_nights(i64::from(nights))?;
        Ok(Self {
            client_id: client_id.into(),
            room_id: room_id.into(),
            nights,
        })
    }

    /// Validates a raw request.
    pub fn parse(raw: &RawBookingRequest) -> Result<Self, ValidationError> {
        let client_id = positive_int("client_id", raw.client_id.as_ref())?;
        let room_id = positive_int("room_id", raw.room_id.as_ref())?;
        let nights = int_field("nights", raw.nights.as_ref())?;
        let nights = check_nights(nights)?;

        Ok(Self {
            client_id: ClientId::new(client_id),
            room_id: RoomId::new(room_id),
            nights,
        })
    }

    /// Computes `price_per_night * nights` in integer cents.
    pub fn total_price(&self, price_per_night: Money) -> Result<Money, ValidationError> {
        price_per_night
            .checked_multiply(self.nights)
            .ok_or(ValidationError::PriceOverflow {
                nights: self.nights,
            })
    }
}

fn check_nights(nights: i64) -> Result<u32, ValidationError> {
    if nights < 1 || nights > i64::from(MAX_NIGHTS) {
        return Err(ValidationError::NightsOutOfRange {
            nights,
            max: MAX_NIGHTS,
        });
    }
    // in range, cannot truncate
    Ok(nights as u32)
}

fn positive_int(field: &'static str, value: Option<&Value>) -> Result<i64, ValidationError> {
    let n = int_field(field, value)?;
    if n <= 0 {
        return Err(ValidationError::Malformed {
            field,
            reason: format!("must be a positive integer, got {n}"),
        });
    }
    Ok(n)
}

/// Accepts JSON integers and numeric strings (HTML forms post strings).
fn int_field(field: &'static str, value: Option<&Value>) -> Result<i64, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| ValidationError::Malformed {
            field,
            reason: format!("expected an integer, got {n}"),
        }),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(ValidationError::MissingField(field));
            }
            trimmed.parse().map_err(|_| ValidationError::Malformed {
                field,
                reason: format!("expected an integer, got {s:?}"),
            })
        }
        Some(other) => Err(ValidationError::Malformed {
            field,
            reason: format!("expected an integer, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawBookingRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_valid_request() {
        let req = BookingRequest::parse(&raw(json!({"client_id": 7, "room_id": 12, "nights": 3})))
            .unwrap();
        assert_eq!(req.client_id, ClientId::new(7));
        assert_eq!(req.room_id, RoomId::new(12));
        assert_eq!(req.nights, 3);
    }

    #[test]
    fn test_parse_accepts_numeric_strings() {
        let req =
            BookingRequest::parse(&raw(json!({"client_id": "7", "room_id": " 12 ", "nights": "2"})))
                .unwrap();
        assert_eq!(req.room_id, RoomId::new(12));
        assert_eq!(req.nights, 2);
    }

    #[test]
    fn test_missing_fields() {
        let err = BookingRequest::parse(&raw(json!({"room_id": 12, "nights": 1}))).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("client_id"));

        let err = BookingRequest::parse(&raw(json!({"client_id": 7, "room_id": null, "nights": 1})))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("room_id"));

        let err = BookingRequest::parse(&raw(json!({"client_id": 7, "room_id": 12}))).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("nights"));
    }

    #[test]
    fn test_malformed_fields() {
        let err = BookingRequest::parse(&raw(json!({"client_id": "abc", "room_id": 12, "nights": 1})))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { field: "client_id", .. }));

        let err = BookingRequest::parse(&raw(json!({"client_id": 7, "room_id": 1.5, "nights": 1})))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { field: "room_id", .. }));

        let err = BookingRequest::parse(&raw(json!({"client_id": -1, "room_id": 12, "nights": 1})))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { field: "client_id", .. }));
    }

    #[test]
    fn test_nights_bounds() {
        for nights in [0, -2, 366] {
            let err = BookingRequest::parse(&raw(
                json!({"client_id": 7, "room_id": 12, "nights": nights}),
            ))
            .unwrap_err();
            assert!(matches!(err, ValidationError::NightsOutOfRange { .. }));
        }
        assert!(BookingRequest::new(7, 12, 365).is_ok());
        assert!(BookingRequest::new(7, 12, 0).is_err());
    }

    #[test]
    fn test_total_price_is_price_times_nights() {
        let req = BookingRequest::new(7, 12, 3).unwrap();
        assert_eq!(
            req.total_price(Money::from_units(100)).unwrap(),
            Money::from_units(300)
        );
        assert_eq!(
            req.total_price(Money::from_cents(3333)).unwrap(),
            Money::from_cents(9999)
        );
    }

    #[test]
    fn test_total_price_overflow() {
        let req = BookingRequest::new(7, 12, 2).unwrap();
        assert_eq!(
            req.total_price(Money::from_cents(i64::MAX)),
            Err(ValidationError::PriceOverflow { nights: 2 })
        );
    }
}
