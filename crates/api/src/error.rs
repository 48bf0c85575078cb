//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::ValidationError;
use saga::{SagaError, UpstreamFailure};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or invalid request body.
    BadRequest(String),
    /// Saga outcome.
    Saga(SagaError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Saga(err) => saga_status(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(msg) => serde_json::json!({ "error": msg }),
            ApiError::Saga(SagaError::InconsistentState(alert)) => {
                // Already escalated through the alert sink; logged here for the request trace.
                tracing::error!(error = %alert, "request left stores inconsistent");
                serde_json::json!({
                    "error": format!("Inconsistent state: {alert}"),
                    "alert": alert,
                })
            }
            ApiError::Saga(err) => serde_json::json!({
                "error": err.to_string(),
                "retryable": err.is_retryable(),
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn saga_status(err: &SagaError) -> StatusCode {
    match err {
        SagaError::Validation(_) => StatusCode::BAD_REQUEST,
        SagaError::NotFound { .. } => StatusCode::NOT_FOUND,
        SagaError::Conflict(_) => StatusCode::CONFLICT,
        SagaError::UpstreamUnavailable {
            failure: UpstreamFailure::Timeout(_),
            ..
        } => StatusCode::GATEWAY_TIMEOUT,
        SagaError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        SagaError::InconsistentState(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(format!("Validation error: {err}"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ReservationId, RoomId};
    use gateways::Service;
    use saga::ConflictReason;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (SagaError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                SagaError::NotFound {
                    entity: "reservation",
                    id: "x".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                SagaError::Conflict(ConflictReason::RoomUnavailable {
                    room_id: RoomId::new(1),
                }),
                StatusCode::CONFLICT,
            ),
            (
                SagaError::Conflict(ConflictReason::AlreadyCancelled {
                    reservation_id: ReservationId::new("x"),
                }),
                StatusCode::CONFLICT,
            ),
            (
                SagaError::UpstreamUnavailable {
                    service: Service::Rooms,
                    failure: UpstreamFailure::Timeout(Duration::from_secs(3)),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                SagaError::UpstreamUnavailable {
                    service: Service::Clients,
                    failure: UpstreamFailure::Error("refused".into()),
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::Saga(err).status(), expected);
        }
    }

    #[test]
    fn test_validation_error_is_bad_request() {
        let err: ApiError = ValidationError::MissingField("nights").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
