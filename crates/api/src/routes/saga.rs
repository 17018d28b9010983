//! Saga outcome inspection endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use saga::SagaOutcome;
use serde::Deserialize;

use crate::AppState;

#[derive(Deserialize)]
pub struct EventsQuery {
    pub payment_id: Option<String>,
}

/// GET /saga/events — recent outcome events, oldest first.
pub async fn events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<SagaOutcome>> {
    Json(state.history.recent(query.payment_id.as_deref()).await)
}
