//! Bounded history of saga outcomes observed on the saga exchange.

use std::collections::VecDeque;
use std::sync::Arc;

use broker::Delivery;
use futures_util::{Stream, StreamExt};
use saga::SagaOutcome;
use tokio::sync::RwLock;

/// Keeps the most recent outcome events for the inspection endpoint.
#[derive(Debug, Clone)]
pub struct SagaHistory {
    events: Arc<RwLock<VecDeque<SagaOutcome>>>,
    limit: usize,
}

impl SagaHistory {
    /// Creates an empty history that keeps at most `limit` events.
    pub fn new(limit: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(VecDeque::with_capacity(limit.min(1024)))),
            limit,
        }
    }

    /// Appends an event, evicting the oldest once the limit is reached.
    pub async fn record(&self, outcome: SagaOutcome) {
        if self.limit == 0 {
            return;
        }
        let mut events = self.events.write().await;
        while events.len() >= self.limit {
            events.pop_front();
        }
        events.push_back(outcome);
    }

    /// Returns recorded events oldest first, optionally for one payment.
    pub async fn recent(&self, payment_id: Option<&str>) -> Vec<SagaOutcome> {
        let events = self.events.read().await;
        events
            .iter()
            .filter(|e| payment_id.is_none_or(|id| e.payment_id == id))
            .cloned()
            .collect()
    }

    /// Records every decodable outcome from `feed` until it ends.
    #[tracing::instrument(skip_all, fields(consumer = "saga-history"))]
    pub async fn run<S>(&self, mut feed: S)
    where
        S: Stream<Item = Delivery> + Unpin,
    {
        while let Some(delivery) = feed.next().await {
            match serde_json::from_slice::<SagaOutcome>(&delivery.body) {
                Ok(outcome) => self.record(outcome).await,
                Err(e) => tracing::debug!(
                    error = %e,
                    routing_key = %delivery.routing_key,
                    "ignoring undecodable saga message"
                ),
            }
        }
    }
}
