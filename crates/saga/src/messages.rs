//! Inbound message decoding.
//!
//! Balance updates are decoded in two stages: a strict decode into the
//! expected shape, then, if that fails, a permissive extraction from a generic
//! JSON object that defaults missing or mistyped identifiers to empty. Either
//! path ends in the same validation of amount and operation kind.
//!
//! Compensation requests are decoded strictly.

use std::str::FromStr;

use common::{AccountId, PaymentId};
use ledger::OperationKind;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::SagaError;

/// A validated forward balance change.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceUpdate {
    /// `None` when absent or empty; such updates cannot be compensated.
    pub payment_id: Option<PaymentId>,
    pub account_id: AccountId,
    pub amount: Decimal,
    pub operation: OperationKind,
    /// Carried through, never interpreted.
    pub currency: Option<String>,
}

/// A balance update that could not be accepted.
#[derive(Debug)]
pub struct RejectedUpdate {
    /// The payment ID, if it could be extracted before the failure.
    pub payment_id: Option<PaymentId>,
    pub error: SagaError,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StrictBalanceUpdate {
    payment_id: String,
    account_id: String,
    amount: String,
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    currency: Option<String>,
}

/// Fields as extracted by either decode stage, before validation.
#[derive(Debug, Default)]
struct RawBalanceUpdate {
    payment_id: String,
    account_id: String,
    amount: Option<String>,
    operation: Option<String>,
    currency: Option<String>,
}

impl From<StrictBalanceUpdate> for RawBalanceUpdate {
    fn from(strict: StrictBalanceUpdate) -> Self {
        Self {
            payment_id: strict.payment_id,
            account_id: strict.account_id,
            amount: Some(strict.amount),
            operation: strict.operation,
            currency: strict.currency,
        }
    }
}

impl RawBalanceUpdate {
    fn from_object(object: &Map<String, Value>) -> Self {
        let string = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            payment_id: string("paymentId").unwrap_or_default(),
            account_id: string("accountId").unwrap_or_default(),
            amount: string("amount"),
            operation: string("operation"),
            currency: string("currency"),
        }
    }

    fn validate(self) -> Result<BalanceUpdate, RejectedUpdate> {
        let payment_id = PaymentId::non_empty(self.payment_id);
        let reject = |error: SagaError| RejectedUpdate {
            payment_id: payment_id.clone(),
            error,
        };

        let amount = match self.amount.as_deref() {
            Some(raw) => parse_amount(raw).map_err(reject)?,
            None => return Err(reject(SagaError::InvalidAmount("missing amount".to_string()))),
        };

        let operation = match self.operation.as_deref() {
            Some(raw) => raw
                .parse::<OperationKind>()
                .map_err(|e| reject(SagaError::Ledger(e)))?,
            None => OperationKind::default(),
        };

        Ok(BalanceUpdate {
            payment_id,
            account_id: AccountId::new(self.account_id),
            amount,
            operation,
            currency: self.currency,
        })
    }
}

fn parse_amount(raw: &str) -> Result<Decimal, SagaError> {
    Decimal::from_str(raw.trim()).map_err(|e| SagaError::InvalidAmount(format!("{raw:?}: {e}")))
}

impl BalanceUpdate {
    /// Decodes and validates a balance update message body.
    ///
    /// # Errors
    ///
    /// Returns a [`RejectedUpdate`] when the body is not a JSON object, the
    /// amount is missing or not a plain decimal string, or the operation is
    /// a string other than `DEBIT`/`CREDIT`. An absent or non-string operation
    /// defaults to `DEBIT`.
    pub fn decode(body: &[u8]) -> Result<Self, RejectedUpdate> {
        let raw = match serde_json::from_slice::<StrictBalanceUpdate>(body) {
            Ok(strict) => RawBalanceUpdate::from(strict),
            Err(strict_err) => {
                tracing::debug!(error = %strict_err, "strict decode failed, extracting leniently");
                match serde_json::from_slice::<Value>(body) {
                    Ok(Value::Object(object)) => RawBalanceUpdate::from_object(&object),
                    Ok(other) => {
                        return Err(RejectedUpdate {
                            payment_id: None,
                            error: SagaError::MalformedMessage(format!(
                                "expected a JSON object, got {}",
                                json_kind(&other)
                            )),
                        });
                    }
                    Err(e) => {
                        return Err(RejectedUpdate {
                            payment_id: None,
                            error: SagaError::MalformedMessage(e.to_string()),
                        });
                    }
                }
            }
        };

        raw.validate()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A request to reverse the balance change made for a payment.
///
/// Only `payment_id` is used; the ledger's own record supplies the account
/// and amount to reverse. Producers send `amount` as either a number or a
/// string, so it is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationRequest {
    pub payment_id: PaymentId,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl CompensationRequest {
    /// Decodes a compensation request message body.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::MalformedMessage`] when the body does not match
    /// the expected shape or the payment ID is empty.
    pub fn decode(body: &[u8]) -> Result<Self, SagaError> {
        let request: Self =
            serde_json::from_slice(body).map_err(|e| SagaError::MalformedMessage(e.to_string()))?;
        if request.payment_id.as_str().is_empty() {
            return Err(SagaError::MalformedMessage("empty paymentId".to_string()));
        }
        Ok(request)
    }
}
