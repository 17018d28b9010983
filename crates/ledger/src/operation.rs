//! Balance operations and the records kept for compensation.

use std::str::FromStr;

use common::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Direction of a balance change.
///
/// Payments debit by default, so a missing operation is treated as
/// [`OperationKind::Debit`] by the message decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    /// Subtracts the amount from the balance.
    #[default]
    Debit,

    /// Adds the amount to the balance.
    Credit,
}

impl OperationKind {
    /// Returns the operation that undoes this one.
    pub fn inverse(&self) -> Self {
        match self {
            OperationKind::Debit => OperationKind::Credit,
            OperationKind::Credit => OperationKind::Debit,
        }
    }

    /// Applies this operation to `balance`, or `None` on overflow.
    pub fn apply_to(&self, balance: Decimal, amount: Decimal) -> Option<Decimal> {
        match self {
            OperationKind::Debit => balance.checked_sub(amount),
            OperationKind::Credit => balance.checked_add(amount),
        }
    }

    /// Returns the wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Debit => "DEBIT",
            OperationKind::Credit => "CREDIT",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBIT" => Ok(OperationKind::Debit),
            "CREDIT" => Ok(OperationKind::Credit),
            other => Err(LedgerError::UnknownOperation(other.to_string())),
        }
    }
}

/// A forward balance change that was applied and can still be compensated.
///
/// The record holds the values that were actually applied; compensation
/// reverses these, never the payload of the compensation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub kind: OperationKind,
}

impl OperationRecord {
    /// Returns the inverse operation's effect applied to `balance`.
    pub fn reverse(&self, balance: Decimal) -> Option<Decimal> {
        self.kind.inverse().apply_to(balance, self.amount)
    }
}
