//! Publishing contract.

use async_trait::async_trait;

use crate::Result;

/// Publishes messages to an exchange under a routing key.
///
/// Implementations must be thread-safe (Send + Sync); the saga publisher
/// shares one instance across both pipelines.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publishes `body` to `exchange` with `routing_key`.
    ///
    /// Returns the number of queues the message was routed to. A message that
    /// matches no binding is dropped and reported as `0`.
    async fn publish(&self, exchange: &str, routing_key: &str, body: Vec<u8>) -> Result<usize>;
}
