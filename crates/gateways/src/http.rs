//! HTTP implementations of the gateway traits.
//!
//! Routes:
//! - rooms: `GET /rooms`, `GET /rooms/{id}`, `PUT /rooms/{id}/availability`
//! - clients: `GET /clients`, `GET /clients/{id}`
//! - reservations: `POST /reservations`, `GET /reservations`,
//!   `GET /reservations/{id}`, `PUT /reservations/{id}/status`
//! - agencies: `GET /agencies`
//!
//! A `409` on a room write carries `{expected, actual}`; a `409` on a status
//! update carries `{status}`.

use std::time::Duration;

use async_trait::async_trait;
use domain::{
    Agency, Client, ClientId, NewReservation, Reservation, ReservationId, ReservationStatus, Room,
    RoomId, StatusUpdate,
};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::agencies::AgencyDirectory;
use crate::availability::{AvailabilityGateway, AvailabilityUpdate};
use crate::error::{GatewayError, Result};
use crate::identity::IdentityGateway;
use crate::ledger::ReservationLedger;
use crate::service::Service;

/// Connection settings for one upstream service.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL, e.g. `http://localhost:5001`.
    pub base_url: String,

    /// Transport-level request timeout. Orchestrators apply their own
    /// per-call deadline on top of this.
    pub timeout: Duration,
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
struct RestClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    service: Service,
}

impl RestClient {
    fn new(service: Service, config: HttpConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            GatewayError::unavailable(service, format!("invalid base URL {}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::unavailable(
                service,
                format!("invalid base URL {}", config.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::unavailable(service, e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout,
            service,
        })
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    service: self.service,
                    after: self.timeout,
                }
            } else {
                GatewayError::unavailable(self.service, e.to_string())
            }
        })
    }

    /// Maps the response status and decodes a success body.
    async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        entity: &'static str,
        id: &str,
    ) -> Result<T> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found(entity, id));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(service = %self.service, %status, "upstream returned an error status");
            let reason = format!("HTTP {} - {}", status, body.chars().take(200).collect::<String>());
            return Err(if status.is_client_error() {
                GatewayError::Rejected {
                    service: self.service,
                    reason,
                }
            } else {
                GatewayError::unavailable(self.service, reason)
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::InvalidPayload {
                service: self.service,
                reason: e.to_string(),
            })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        entity: &'static str,
        id: &str,
    ) -> Result<T> {
        let response = self.execute(self.client.get(self.url(segments))).await?;
        self.decode(response, entity, id).await
    }
}

/// Rejects ids the URL encoder would drop as dot segments.
fn path_id<'a>(entity: &'static str, id: &'a str) -> Result<&'a str> {
    match id {
        "" | "." | ".." => Err(GatewayError::not_found(entity, id)),
        id => Ok(id),
    }
}

/// Room inventory over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAvailabilityGateway {
    rest: RestClient,
}

impl HttpAvailabilityGateway {
    pub fn new(config: HttpConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(Service::Rooms, config)?,
        })
    }
}

#[derive(Deserialize)]
struct VersionBody {
    version: u64,
}

#[derive(Deserialize)]
struct VersionConflictBody {
    expected: u64,
    actual: u64,
}

#[async_trait]
impl AvailabilityGateway for HttpAvailabilityGateway {
    async fn list_rooms(&self) -> Result<Vec<Room>> {
        self.rest.get(&["rooms"], "rooms", "*").await
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Room> {
        let id = room_id.to_string();
        self.rest.get(&["rooms", id.as_str()], "room", &id).await
    }

    async fn set_availability(&self, room_id: RoomId, update: AvailabilityUpdate) -> Result<u64> {
        let id = room_id.to_string();
        let request = self
            .rest
            .client
            .put(self.rest.url(&["rooms", id.as_str(), "availability"]))
            .json(&update);
        let response = self.rest.execute(request).await?;

        if response.status() == StatusCode::CONFLICT {
            let body: VersionConflictBody =
                response
                    .json()
                    .await
                    .map_err(|e| GatewayError::InvalidPayload {
                        service: Service::Rooms,
                        reason: e.to_string(),
                    })?;
            return Err(GatewayError::VersionConflict {
                room_id: id,
                expected: body.expected,
                actual: body.actual,
            });
        }

        let body: VersionBody = self.rest.decode(response, "room", &id).await?;
        Ok(body.version)
    }
}

/// Client directory over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIdentityGateway {
    rest: RestClient,
}

impl HttpIdentityGateway {
    pub fn new(config: HttpConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(Service::Clients, config)?,
        })
    }
}

#[async_trait]
impl IdentityGateway for HttpIdentityGateway {
    async fn list_clients(&self) -> Result<Vec<Client>> {
        self.rest.get(&["clients"], "clients", "*").await
    }

    async fn get_client(&self, client_id: ClientId) -> Result<Client> {
        let id = client_id.to_string();
        self.rest.get(&["clients", id.as_str()], "client", &id).await
    }
}

/// Reservation ledger over HTTP.
#[derive(Debug, Clone)]
pub struct HttpReservationLedger {
    rest: RestClient,
}

impl HttpReservationLedger {
    pub fn new(config: HttpConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(Service::Reservations, config)?,
        })
    }
}

#[derive(Deserialize)]
struct StatusConflictBody {
    status: ReservationStatus,
}

#[async_trait]
impl ReservationLedger for HttpReservationLedger {
    async fn create(&self, reservation: NewReservation) -> Result<Reservation> {
        let request = self
            .rest
            .client
            .post(self.rest.url(&["reservations"]))
            .json(&reservation);
        let response = self.rest.execute(request).await?;
        self.rest.decode(response, "reservation", "new").await
    }

    async fn list(&self) -> Result<Vec<Reservation>> {
        self.rest.get(&["reservations"], "reservations", "*").await
    }

    async fn get(&self, reservation_id: &ReservationId) -> Result<Reservation> {
        let id = path_id("reservation", reservation_id.as_str())?;
        self.rest
            .get(&["reservations", id], "reservation", id)
            .await
    }

    async fn update_status(
        &self,
        reservation_id: &ReservationId,
        update: StatusUpdate,
    ) -> Result<Reservation> {
        let id = path_id("reservation", reservation_id.as_str())?;
        let request = self
            .rest
            .client
            .put(self.rest.url(&["reservations", id, "status"]))
            .json(&update);
        let response = self.rest.execute(request).await?;

        if response.status() == StatusCode::CONFLICT {
            let body: StatusConflictBody =
                response
                    .json()
                    .await
                    .map_err(|e| GatewayError::InvalidPayload {
                        service: Service::Reservations,
                        reason: e.to_string(),
                    })?;
            return Err(GatewayError::StatusConflict {
                reservation_id: id.to_string(),
                current: body.status,
            });
        }

        self.rest.decode(response, "reservation", id).await
    }
}

/// Agency listing over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAgencyDirectory {
    rest: RestClient,
}

impl HttpAgencyDirectory {
    pub fn new(config: HttpConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(Service::Agencies, config)?,
        })
    }
}

#[async_trait]
impl AgencyDirectory for HttpAgencyDirectory {
    async fn list_agencies(&self) -> Result<Vec<Agency>> {
        self.rest.get(&["agencies"], "agencies", "*").await
    }
}
