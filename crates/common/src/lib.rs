//! Shared identifier types for the balance service.

pub mod types;

pub use types::{AccountId, MessageId, PaymentId};
