use common::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur when mutating the ledger.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// The change would take the balance outside the representable range.
    #[error("Balance overflow on account {account_id} applying {amount}")]
    Overflow { account_id: AccountId, amount: Decimal },

    /// The operation kind is neither DEBIT nor CREDIT.
    #[error("Unknown operation kind: {0:?}")]
    UnknownOperation(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
