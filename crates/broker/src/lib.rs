//! Message delivery layer.
//!
//! The balance service consumes from two queues and publishes saga outcomes
//! to a topic exchange. This crate provides the contract the pipelines depend
//! on ([`MessagePublisher`] and the [`Deliveries`] stream) together with an
//! in-process, AMQP-shaped topic broker:
//! - exchanges route by topic pattern (`*` one word, `#` zero or more words)
//! - queues buffer messages until a consumer attaches
//! - each queue has a single consumer that sees messages in publish order

pub mod delivery;
pub mod error;
pub mod memory;
pub mod publisher;
pub mod topic;

pub use common::MessageId;
pub use delivery::{Deliveries, Delivery};
pub use error::{BrokerError, Result};
pub use memory::InMemoryBroker;
pub use publisher::MessagePublisher;
pub use topic::TopicPattern;
