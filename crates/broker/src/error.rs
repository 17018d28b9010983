use thiserror::Error;

/// Errors raised by the message broker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The exchange has not been declared.
    #[error("Exchange not found: {0}")]
    ExchangeNotFound(String),

    /// The queue has not been declared.
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// The queue already has a consumer attached.
    #[error("Queue {0} already has a consumer")]
    AlreadyConsuming(String),

    /// A binding pattern is not a valid topic pattern.
    #[error("Invalid binding pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
