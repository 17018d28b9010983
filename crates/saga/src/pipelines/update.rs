//! Forward balance update pipeline.

use std::time::Instant;

use broker::Delivery;
use futures_util::{Stream, StreamExt};
use ledger::{ApplyOutcome, LedgerStore};

use crate::error::SagaError;
use crate::events::SagaOutcome;
use crate::messages::BalanceUpdate;
use crate::publisher::SagaPublisher;

/// Applies balance update events to the ledger and reports the outcome.
///
/// Per-message failures never stop the pipeline: they are logged, reported
/// as `BalanceFailed`, and the next message is processed.
#[derive(Debug, Clone)]
pub struct UpdatePipeline {
    ledger: LedgerStore,
    publisher: SagaPublisher,
}

impl UpdatePipeline {
    /// Creates a pipeline over a shared ledger.
    pub fn new(ledger: LedgerStore, publisher: SagaPublisher) -> Self {
        Self { ledger, publisher }
    }

    /// Consumes `feed` until it ends, handling one delivery at a time.
    #[tracing::instrument(skip_all, fields(pipeline = "update"))]
    pub async fn run<S>(&self, mut feed: S)
    where
        S: Stream<Item = Delivery> + Unpin,
    {
        tracing::info!("listening for balance updates");
        while let Some(delivery) = feed.next().await {
            self.handle(&delivery).await;
        }
        tracing::info!("balance update feed closed");
    }

    /// Handles a single delivery.
    ///
    /// Returns the outcome event that was published, or `None` when the update
    /// was applied without a payment ID and nothing was reported.
    #[tracing::instrument(skip_all, fields(message_id = %delivery.message_id))]
    pub async fn handle(&self, delivery: &Delivery) -> Option<SagaOutcome> {
        let update = match BalanceUpdate::decode(&delivery.body) {
            Ok(update) => update,
            Err(rejected) => {
                let payment_id = rejected.payment_id.as_ref();
                tracing::warn!(
                    payment_id = payment_id.map(|id| id.as_str()).unwrap_or_default(),
                    error = %rejected.error,
                    "rejected balance update"
                );
                metrics::counter!("balance_updates_total", "result" => "rejected").increment(1);
                let outcome = SagaOutcome::balance_failed(payment_id, rejected.error.to_string());
                self.publisher.publish(&outcome).await;
                return Some(outcome);
            }
        };

        let start = Instant::now();
        let applied = self
            .ledger
            .apply(
                &update.account_id,
                update.amount,
                update.operation,
                update.payment_id.as_ref(),
            )
            .await;
        let latency_us = start.elapsed().as_micros() as u64;
        metrics::histogram!("balance_update_latency_us").record(latency_us as f64);

        let payment_id = update.payment_id.as_ref();
        match &applied {
            Ok(result) => tracing::info!(
                service = "balance",
                latency_us,
                account_id = %update.account_id,
                payment_id = payment_id.map(|id| id.as_str()).unwrap_or_default(),
                applied = result.is_applied(),
                balance = %result.balance(),
                "balance update handled"
            ),
            Err(e) => tracing::warn!(
                service = "balance",
                latency_us,
                account_id = %update.account_id,
                payment_id = payment_id.map(|id| id.as_str()).unwrap_or_default(),
                error = %e,
                "balance update failed"
            ),
        }

        let outcome = match (applied, payment_id) {
            (Err(e), _) => {
                metrics::counter!("balance_updates_total", "result" => "rejected").increment(1);
                SagaOutcome::balance_failed(payment_id, SagaError::from(e).to_string())
            }
            (Ok(ApplyOutcome::AlreadyCompensated { .. }), Some(id)) => {
                metrics::counter!("balance_updates_total", "result" => "compensated").increment(1);
                SagaOutcome::balance_failed(
                    Some(id),
                    SagaError::AlreadyCompensated(id.clone()).to_string(),
                )
            }
            (Ok(ApplyOutcome::Duplicate { .. }), Some(id)) => {
                metrics::counter!("balance_updates_total", "result" => "duplicate").increment(1);
                SagaOutcome::balance_completed(id)
            }
            (Ok(_), Some(id)) => {
                metrics::counter!("balance_updates_total", "result" => "applied").increment(1);
                SagaOutcome::balance_completed(id)
            }
            (Ok(_), None) => {
                metrics::counter!("balance_updates_total", "result" => "applied").increment(1);
                return None;
            }
        };

        self.publisher.publish(&outcome).await;
        Some(outcome)
    }
}
