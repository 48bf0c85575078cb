//! Application configuration loaded from environment variables.

use std::time::Duration;

use gateways::{Gateways, HttpConfig};
use saga::{RetryPolicy, SagaConfig};
use view::ViewConfig;

const DEFAULT_ROOMS_URL: &str = "http://localhost:5001";
const DEFAULT_CLIENTS_URL: &str = "http://localhost:5002";
const DEFAULT_RESERVATIONS_URL: &str = "http://localhost:5003";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `text` or `json` (default `text`)
/// - `ROOMS_SERVICE_URL`, `CLIENTS_SERVICE_URL`, `RESERVATIONS_SERVICE_URL`,
///   `AGENCIES_SERVICE_URL`: upstream base URLs. Agencies default to the
///   rooms URL, since the room service serves them.
/// - `SAGA_CALL_TIMEOUT_MS` (3000), `VIEW_CALL_TIMEOUT_MS` (8000)
/// - `RELEASE_MAX_ATTEMPTS` (3), `RELEASE_BASE_DELAY_MS` (100)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub rooms_url: String,
    pub clients_url: String,
    pub reservations_url: String,
    pub agencies_url: String,
    pub saga_call_timeout: Duration,
    pub view_call_timeout: Duration,
    pub release_max_attempts: u32,
    pub release_base_delay: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup. Unparseable numbers
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };
        let rooms_url = lookup("ROOMS_SERVICE_URL").unwrap_or(defaults.rooms_url);

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            agencies_url: lookup("AGENCIES_SERVICE_URL").unwrap_or_else(|| rooms_url.clone()),
            rooms_url,
            clients_url: lookup("CLIENTS_SERVICE_URL").unwrap_or(defaults.clients_url),
            reservations_url: lookup("RESERVATIONS_SERVICE_URL")
                .unwrap_or(defaults.reservations_url),
            saga_call_timeout: millis("SAGA_CALL_TIMEOUT_MS", defaults.saga_call_timeout),
            view_call_timeout: millis("VIEW_CALL_TIMEOUT_MS", defaults.view_call_timeout),
            release_max_attempts: lookup("RELEASE_MAX_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.release_max_attempts),
            release_base_delay: millis("RELEASE_BASE_DELAY_MS", defaults.release_base_delay),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn saga_config(&self) -> SagaConfig {
        SagaConfig::default()
            .with_call_timeout(self.saga_call_timeout)
            .with_retry(RetryPolicy::new(
                self.release_max_attempts,
                self.release_base_delay,
            ))
    }

    pub fn view_config(&self) -> ViewConfig {
        ViewConfig::default().with_source_timeout(self.view_call_timeout)
    }

    /// HTTP gateways for the configured URLs. The transport timeout is the
    /// longest per-call deadline, so the deadlines are what cut calls short.
    pub fn http_gateways(&self) -> gateways::Result<Gateways> {
        let transport_timeout = self.saga_call_timeout.max(self.view_call_timeout);
        let http = |url: &str| HttpConfig::new(url).with_timeout(transport_timeout);

        Gateways::http(
            http(&self.rooms_url),
            http(&self.clients_url),
            http(&self.reservations_url),
            http(&self.agencies_url),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        let saga = SagaConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            rooms_url: DEFAULT_ROOMS_URL.to_string(),
            clients_url: DEFAULT_CLIENTS_URL.to_string(),
            reservations_url: DEFAULT_RESERVATIONS_URL.to_string(),
            agencies_url: DEFAULT_ROOMS_URL.to_string(),
            saga_call_timeout: saga.call_timeout,
            view_call_timeout: ViewConfig::default().source_timeout,
            release_max_attempts: saga.retry.max_attempts,
            release_base_delay: saga.retry.base_delay,
        }
    }
}
