//! Saga outcome events.

use chrono::Utc;
use common::PaymentId;
use serde::{Deserialize, Serialize};

/// Names of the outcome events this participant publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SagaEventName {
    /// A balance update was applied.
    BalanceCompleted,

    /// A balance update was rejected.
    BalanceFailed,

    /// A compensation request was processed.
    CompensationCompleted,
}

impl SagaEventName {
    /// Returns the event name as published in the `event` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaEventName::BalanceCompleted => "BalanceCompleted",
            SagaEventName::BalanceFailed => "BalanceFailed",
            SagaEventName::CompensationCompleted => "CompensationCompleted",
        }
    }

    /// Returns the dotted `<namespace>.<verb>` routing key for the event.
    pub fn routing_key(&self) -> &'static str {
        match self {
            SagaEventName::BalanceCompleted => "balance.completed",
            SagaEventName::BalanceFailed => "balance.failed",
            SagaEventName::CompensationCompleted => "compensation.completed",
        }
    }
}

impl std::fmt::Display for SagaEventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outcome event published to the saga coordination exchange.
///
/// Wire format: `{"event", "paymentId", "ts", "reason"?}` where `ts` is
/// milliseconds since the Unix epoch and `reason` is present only on failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaOutcome {
    pub event: SagaEventName,
    /// Empty when the inbound message did not carry a usable payment ID.
    pub payment_id: String,
    pub ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SagaOutcome {
    fn now(event: SagaEventName, payment_id: Option<&PaymentId>, reason: Option<String>) -> Self {
        Self {
            event,
            payment_id: payment_id.map(|id| id.to_string()).unwrap_or_default(),
            ts: Utc::now().timestamp_millis(),
            reason,
        }
    }

    /// Creates a BalanceCompleted event.
    pub fn balance_completed(payment_id: &PaymentId) -> Self {
        Self::now(SagaEventName::BalanceCompleted, Some(payment_id), None)
    }

    /// Creates a BalanceFailed event.
    pub fn balance_failed(payment_id: Option<&PaymentId>, reason: impl Into<String>) -> Self {
        Self::now(SagaEventName::BalanceFailed, payment_id, Some(reason.into()))
    }

    /// Creates a CompensationCompleted event.
    pub fn compensation_completed(payment_id: &PaymentId) -> Self {
        Self::now(SagaEventName::CompensationCompleted, Some(payment_id), None)
    }

    /// Returns the routing key this outcome is published under.
    pub fn routing_key(&self) -> &'static str {
        self.event.routing_key()
    }
}
