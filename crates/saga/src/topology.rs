//! Exchange and queue topology of the balance participant.

use broker::InMemoryBroker;

/// Names of the exchanges, queues and bindings the pipelines use.
///
/// Inbound events arrive on the balance exchange under the update and
/// compensation routing keys; outcomes leave through the saga exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub balance_exchange: String,
    pub saga_exchange: String,
    pub update_queue: String,
    pub compensation_queue: String,
    pub update_routing_key: String,
    pub compensation_routing_key: String,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            balance_exchange: "balance".to_string(),
            saga_exchange: "saga".to_string(),
            update_queue: "balance.updates".to_string(),
            compensation_queue: "balance.compensation".to_string(),
            update_routing_key: "update".to_string(),
            compensation_routing_key: "compensation".to_string(),
        }
    }
}

impl Topology {
    /// Declares both exchanges and both queues and binds the queues.
    ///
    /// Safe to call more than once.
    #[tracing::instrument(skip(self, broker))]
    pub async fn declare(&self, broker: &InMemoryBroker) -> broker::Result<()> {
        broker.declare_exchange(&self.balance_exchange).await;
        broker.declare_exchange(&self.saga_exchange).await;
        broker.declare_queue(&self.update_queue).await;
        broker.declare_queue(&self.compensation_queue).await;
        broker
            .bind_queue(
                &self.update_queue,
                &self.balance_exchange,
                &self.update_routing_key,
            )
            .await?;
        broker
            .bind_queue(
                &self.compensation_queue,
                &self.balance_exchange,
                &self.compensation_routing_key,
            )
            .await?;

        tracing::info!(
            balance_exchange = %self.balance_exchange,
            saga_exchange = %self.saga_exchange,
            "topology declared"
        );
        Ok(())
    }
}
