//! Saga participant error types.

use broker::BrokerError;
use common::PaymentId;
use ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur while handling saga messages.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The message body could not be decoded.
    #[error("Invalid message: {0}")]
    MalformedMessage(String),

    /// The amount field is missing or not a decimal string.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The payment was compensated and cannot be applied again.
    #[error("Payment already compensated: {0}")]
    AlreadyCompensated(PaymentId),

    /// Ledger error.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Broker error.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
