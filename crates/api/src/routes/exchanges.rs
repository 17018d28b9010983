//! Ingress for external producers.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use broker::MessagePublisher;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct PublishResponse {
    pub exchange: String,
    pub routing_key: String,
    pub routed: usize,
}

/// POST /exchanges/{exchange}/{routing_key} — publish the raw request body.
///
/// The body is forwarded untouched; validation is the consumers' job.
#[tracing::instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn publish(
    State(state): State<Arc<AppState>>,
    Path((exchange, routing_key)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<PublishResponse>), ApiError> {
    if routing_key.is_empty() {
        return Err(ApiError::BadRequest("routing key must not be empty".to_string()));
    }

    let routed = state
        .broker
        .publish(&exchange, &routing_key, body.to_vec())
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishResponse {
            exchange,
            routing_key,
            routed,
        }),
    ))
}
