//! Best-effort publishing of saga outcome events.

use std::sync::Arc;

use broker::MessagePublisher;

use crate::Result;
use crate::events::SagaOutcome;

/// Publishes [`SagaOutcome`]s to the saga coordination exchange.
///
/// Stateless apart from its destination; cloned into each pipeline.
/// Failures are logged and never returned to the caller.
#[derive(Clone)]
pub struct SagaPublisher {
    publisher: Arc<dyn MessagePublisher>,
    exchange: String,
}

impl SagaPublisher {
    /// Creates a publisher that emits to `exchange` through `publisher`.
    pub fn new(publisher: Arc<dyn MessagePublisher>, exchange: impl Into<String>) -> Self {
        Self {
            publisher,
            exchange: exchange.into(),
        }
    }

    /// Publishes `outcome`, logging instead of failing.
    ///
    /// Returns true if the broker accepted the message.
    #[tracing::instrument(skip(self, outcome), fields(event = %outcome.event, payment_id = %outcome.payment_id))]
    pub async fn publish(&self, outcome: &SagaOutcome) -> bool {
        match self.try_publish(outcome).await {
            Ok(routed) => {
                metrics::counter!("saga_events_published_total", "event" => outcome.event.as_str())
                    .increment(1);
                tracing::info!(routed, "published saga event");
                true
            }
            Err(e) => {
                metrics::counter!("saga_events_publish_failures_total", "event" => outcome.event.as_str())
                    .increment(1);
                tracing::error!(error = %e, "failed to publish saga event");
                false
            }
        }
    }

    async fn try_publish(&self, outcome: &SagaOutcome) -> Result<usize> {
        let body = serde_json::to_vec(outcome)?;
        let routed = self
            .publisher
            .publish(&self.exchange, outcome.routing_key(), body)
            .await?;
        Ok(routed)
    }
}

impl std::fmt::Debug for SagaPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaPublisher")
            .field("exchange", &self.exchange)
            .finish_non_exhaustive()
    }
}
