//! Balance participant of the payment saga.
//!
//! This crate wires the ledger to the message delivery layer:
//! 1. The update pipeline applies balance changes and reports
//!    `BalanceCompleted` or `BalanceFailed`.
//! 2. The compensation pipeline reverses the change recorded for a payment
//!    and reports `CompensationCompleted`.
//!
//! Both pipelines publish through the shared [`SagaPublisher`] and run
//! concurrently against one [`ledger::LedgerStore`].

pub mod error;
pub mod events;
pub mod messages;
pub mod pipelines;
pub mod publisher;
pub mod topology;

pub use error::{Result, SagaError};
pub use events::{SagaEventName, SagaOutcome};
pub use messages::{BalanceUpdate, CompensationRequest, RejectedUpdate};
pub use pipelines::{CompensationPipeline, UpdatePipeline};
pub use publisher::SagaPublisher;
pub use topology::Topology;
