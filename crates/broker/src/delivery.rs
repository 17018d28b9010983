//! Delivered messages and the per-queue delivery feed.

use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use common::MessageId;
use futures_util::Stream;
use tokio::sync::mpsc;

/// A message as seen by a queue consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Unique ID assigned at publish time.
    pub message_id: MessageId,
    /// Exchange the message was published to.
    pub exchange: String,
    /// Routing key the message was published with.
    pub routing_key: String,
    /// Raw message body.
    pub body: Vec<u8>,
    /// When the message was published.
    pub published_at: DateTime<Utc>,
}

impl Delivery {
    /// Creates a delivery with a fresh message ID and the current time.
    pub fn new(
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            message_id: MessageId::new(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            body: body.into(),
            published_at: Utc::now(),
        }
    }
}

/// A feed of deliveries for one queue, in publish order.
///
/// The stream ends only when the queue is closed or the broker is dropped.
#[derive(Debug)]
pub struct Deliveries {
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl Deliveries {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Delivery>) -> Self {
        Self { receiver }
    }
}

impl Stream for Deliveries {
    type Item = Delivery;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
