//! Balance ledger for the payment saga.
//!
//! This crate owns the only mutable state of the balance service:
//! - current balances keyed by account
//! - operation records keyed by payment, kept until compensated
//! - tombstones for payments that have already been compensated
//!
//! [`LedgerStore`] serializes every mutation behind a single reader/writer
//! lock so that forward updates and compensations issued from independent
//! tasks always observe a consistent view.

pub mod error;
pub mod operation;
pub mod store;

pub use common::{AccountId, PaymentId};
pub use error::{LedgerError, Result};
pub use operation::{OperationKind, OperationRecord};
pub use store::{ApplyOutcome, CompensationOutcome, LedgerStore};
