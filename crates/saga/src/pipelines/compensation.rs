//! Compensation pipeline.

use broker::Delivery;
use futures_util::{Stream, StreamExt};
use ledger::LedgerStore;

use crate::events::SagaOutcome;
use crate::messages::CompensationRequest;
use crate::publisher::SagaPublisher;

/// Reverses previously applied updates on request.
///
/// Malformed requests are logged and skipped without an outcome event.
/// Every decoded request is reported as `CompensationCompleted`, whether or
/// not the ledger had anything to reverse. A reversal the ledger refuses
/// (balance overflow) is logged and not reported.
#[derive(Debug, Clone)]
pub struct CompensationPipeline {
    ledger: LedgerStore,
    publisher: SagaPublisher,
}

impl CompensationPipeline {
    /// Creates a pipeline over a shared ledger.
    pub fn new(ledger: LedgerStore, publisher: SagaPublisher) -> Self {
        Self { ledger, publisher }
    }

    /// Consumes `feed` until it ends, handling one delivery at a time.
    #[tracing::instrument(skip_all, fields(pipeline = "compensation"))]
    pub async fn run<S>(&self, mut feed: S)
    where
        S: Stream<Item = Delivery> + Unpin,
    {
        tracing::info!("listening for compensation requests");
        while let Some(delivery) = feed.next().await {
            self.handle(&delivery).await;
        }
        tracing::info!("compensation feed closed");
    }

    /// Handles a single delivery, returning the published outcome if any.
    #[tracing::instrument(skip_all, fields(message_id = %delivery.message_id))]
    pub async fn handle(&self, delivery: &Delivery) -> Option<SagaOutcome> {
        let request = match CompensationRequest::decode(&delivery.body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode compensation request");
                metrics::counter!("compensations_total", "result" => "rejected").increment(1);
                return None;
            }
        };

        let result = match self.ledger.compensate(&request.payment_id).await {
            Ok(outcome) if outcome.is_reversed() => "reversed",
            Ok(_) => "noop",
            Err(e) => {
                tracing::error!(payment_id = %request.payment_id, error = %e, "compensation failed");
                metrics::counter!("compensations_total", "result" => "failed").increment(1);
                return None;
            }
        };
        metrics::counter!("compensations_total", "result" => result).increment(1);
        tracing::info!(payment_id = %request.payment_id, result, "compensation processed");

        let outcome = SagaOutcome::compensation_completed(&request.payment_id);
        self.publisher.publish(&outcome).await;
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use broker::InMemoryBroker;
    use common::{AccountId, PaymentId};
    use futures_util::stream;
    use ledger::OperationKind;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::events::SagaEventName;

    async fn pipeline() -> (CompensationPipeline, LedgerStore) {
        let broker = InMemoryBroker::new();
        broker.declare_exchange("saga").await;
        let ledger = LedgerStore::new();
        let publisher = SagaPublisher::new(Arc::new(broker), "saga");
        (CompensationPipeline::new(ledger.clone(), publisher), ledger)
    }

    fn compensation(body: &str) -> Delivery {
        Delivery::new("balance", "compensation", body)
    }

    #[tokio::test]
    async fn test_reverses_recorded_operation_not_request_payload() {
        let (pipeline, ledger) = pipeline().await;
        let a1 = AccountId::new("a1");
        ledger
            .apply(&a1, dec!(50.00), OperationKind::Debit, Some(&PaymentId::new("p1")))
            .await
            .unwrap();

        let outcome = pipeline
            .handle(&compensation(
                r#"{"paymentId":"p1","accountId":"other","amount":"999.00"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(outcome.event, SagaEventName::CompensationCompleted);
        assert_eq!(outcome.payment_id, "p1");
        assert_eq!(ledger.get(&a1).await, Decimal::ZERO);
        assert_eq!(ledger.get(&AccountId::new("other")).await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_unknown_payment_still_reports_completed() {
        let (pipeline, ledger) = pipeline().await;

        let outcome = pipeline
            .handle(&compensation(r#"{"paymentId":"ghost"}"#))
            .await
            .unwrap();

        assert_eq!(outcome.event, SagaEventName::CompensationCompleted);
        assert!(ledger.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_request_is_skipped_silently() {
        let (pipeline, _) = pipeline().await;

        assert!(pipeline.handle(&compensation("nope")).await.is_none());
        assert!(
            pipeline
                .handle(&compensation(r#"{"accountId":"a1"}"#))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_run_compensates_once_per_payment() {
        let (pipeline, ledger) = pipeline().await;
        let a1 = AccountId::new("a1");
        ledger
            .apply(&a1, dec!(30), OperationKind::Credit, Some(&PaymentId::new("p1")))
            .await
            .unwrap();

        pipeline
            .run(stream::iter(vec![
                compensation(r#"{"paymentId":"p1"}"#),
                compensation("broken"),
                compensation(r#"{"paymentId":"p1"}"#),
            ]))
            .await;

        assert_eq!(ledger.get(&a1).await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_overflowing_reversal_is_not_reported() {
        let (pipeline, ledger) = pipeline().await;
        let a1 = AccountId::new("a1");
        ledger
            .apply(&a1, dec!(1), OperationKind::Debit, Some(&PaymentId::new("p1")))
            .await
            .unwrap();
        ledger
            .apply(&a1, Decimal::MAX, OperationKind::Credit, None)
            .await
            .unwrap();
        ledger
            .apply(&a1, dec!(1), OperationKind::Credit, None)
            .await
            .unwrap();

        let outcome = pipeline
            .handle(&compensation(r#"{"paymentId":"p1"}"#))
            .await;

        assert!(outcome.is_none());
        assert!(ledger.operation(&PaymentId::new("p1")).await.is_some());
    }
}
