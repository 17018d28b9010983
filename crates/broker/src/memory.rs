use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use crate::{BrokerError, Deliveries, Delivery, MessagePublisher, Result, TopicPattern};

#[derive(Debug)]
struct Binding {
    queue: String,
    pattern: TopicPattern,
}

#[derive(Debug)]
struct Queue {
    sender: mpsc::UnboundedSender<Delivery>,
    /// Taken by the first consumer.
    receiver: Option<mpsc::UnboundedReceiver<Delivery>>,
}

impl Queue {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Some(receiver),
        }
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    exchanges: HashMap<String, Vec<Binding>>,
    queues: HashMap<String, Queue>,
}

/// In-memory topic broker.
///
/// Mirrors the subset of AMQP topology the balance service relies on: named
/// topic exchanges, named queues that buffer until consumed, and pattern
/// bindings between them. Declarations are idempotent. Cloning yields a
/// handle to the same broker.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<RwLock<BrokerState>>,
}

impl InMemoryBroker {
    /// Creates a broker with no exchanges or queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a topic exchange. Re-declaring an existing exchange is a no-op.
    pub async fn declare_exchange(&self, name: &str) {
        let mut state = self.state.write().await;
        if !state.exchanges.contains_key(name) {
            state.exchanges.insert(name.to_string(), Vec::new());
            tracing::debug!(exchange = name, "exchange declared");
        }
    }

    /// Declares a queue. Re-declaring an existing queue keeps its buffered messages.
    pub async fn declare_queue(&self, name: &str) {
        let mut state = self.state.write().await;
        if !state.queues.contains_key(name) {
            state.queues.insert(name.to_string(), Queue::new());
            tracing::debug!(queue = name, "queue declared");
        }
    }

    /// Binds `queue` to `exchange` for routing keys matching `pattern`.
    ///
    /// # Errors
    ///
    /// Fails if either side is undeclared or the pattern is invalid.
    pub async fn bind_queue(&self, queue: &str, exchange: &str, pattern: &str) -> Result<()> {
        let pattern: TopicPattern = pattern.parse()?;
        let mut state = self.state.write().await;

        if !state.queues.contains_key(queue) {
            return Err(BrokerError::QueueNotFound(queue.to_string()));
        }
        let bindings = state
            .exchanges
            .get_mut(exchange)
            .ok_or_else(|| BrokerError::ExchangeNotFound(exchange.to_string()))?;

        if !bindings
            .iter()
            .any(|b| b.queue == queue && b.pattern == pattern)
        {
            tracing::debug!(queue, exchange, pattern = %pattern, "queue bound");
            bindings.push(Binding {
                queue: queue.to_string(),
                pattern,
            });
        }

        Ok(())
    }

    /// Attaches the single consumer of `queue`.
    ///
    /// Messages published before this call are delivered first.
    ///
    /// # Errors
    ///
    /// Fails if the queue is undeclared or already has a consumer.
    pub async fn consume(&self, queue: &str) -> Result<Deliveries> {
        let mut state = self.state.write().await;
        let entry = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
        let receiver = entry
            .receiver
            .take()
            .ok_or_else(|| BrokerError::AlreadyConsuming(queue.to_string()))?;

        tracing::info!(queue, "consumer attached");
        Ok(Deliveries::new(receiver))
    }

    /// Deletes a queue and its bindings. Its consumer's feed ends once the
    /// already-buffered messages have been drained.
    pub async fn close_queue(&self, queue: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .queues
            .remove(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
        for bindings in state.exchanges.values_mut() {
            bindings.retain(|b| b.queue != queue);
        }
        tracing::info!(queue, "queue closed");
        Ok(())
    }

    /// Returns true if the exchange has been declared.
    pub async fn has_exchange(&self, name: &str) -> bool {
        self.state.read().await.exchanges.contains_key(name)
    }
}

#[async_trait]
impl MessagePublisher for InMemoryBroker {
    async fn publish(&self, exchange: &str, routing_key: &str, body: Vec<u8>) -> Result<usize> {
        let state = self.state.read().await;
        let bindings = state
            .exchanges
            .get(exchange)
            .ok_or_else(|| BrokerError::ExchangeNotFound(exchange.to_string()))?;

        // A queue bound by several matching patterns still gets one copy.
        let targets: BTreeSet<&str> = bindings
            .iter()
            .filter(|b| b.pattern.matches(routing_key))
            .map(|b| b.queue.as_str())
            .collect();

        metrics::counter!("broker_messages_published_total", "exchange" => exchange.to_string())
            .increment(1);

        if targets.is_empty() {
            tracing::debug!(exchange, routing_key, "message unroutable, dropped");
            metrics::counter!("broker_messages_unroutable_total").increment(1);
            return Ok(0);
        }

        let delivery = Delivery::new(exchange, routing_key, body);
        let mut routed = 0;
        for queue in targets {
            let Some(entry) = state.queues.get(queue) else {
                continue;
            };
            if entry.sender.send(delivery.clone()).is_ok() {
                routed += 1;
            } else {
                tracing::warn!(queue, message_id = %delivery.message_id, "consumer gone, message dropped");
            }
        }

        Ok(routed)
    }
}
