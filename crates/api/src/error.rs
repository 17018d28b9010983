//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use broker::BrokerError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Message broker error.
    Broker(BrokerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Broker(err) => broker_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn broker_error_to_response(err: BrokerError) -> (StatusCode, String) {
    match &err {
        BrokerError::ExchangeNotFound(_) | BrokerError::QueueNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        BrokerError::InvalidPattern { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        BrokerError::AlreadyConsuming(_) => {
            tracing::error!(error = %err, "broker error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        ApiError::Broker(err)
    }
}
