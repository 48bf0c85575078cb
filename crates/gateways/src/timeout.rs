//! Per-call deadlines.

use std::future::Future;
use std::time::Duration;

use crate::error::{GatewayError, Result};
use crate::service::Service;

/// Runs a gateway call under its own deadline.
///
/// An elapsed deadline becomes [`GatewayError::Timeout`]; the inner future is
/// dropped.
pub async fn with_timeout<T, F>(service: Service, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(%service, limit_ms = limit.as_millis() as u64, "upstream call timed out");
            Err(GatewayError::Timeout {
                service,
                after: limit,
            })
        }
    }
}
