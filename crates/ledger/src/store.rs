//! The ledger store: balances plus the history needed to compensate.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use common::{AccountId, PaymentId};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::error::{LedgerError, Result};
use crate::operation::{OperationKind, OperationRecord};

/// Result of [`LedgerStore::apply`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApplyOutcome {
    /// The balance was changed.
    Applied { balance: Decimal },

    /// A live operation record already exists for this payment; the
    /// redelivered update was ignored.
    Duplicate { balance: Decimal },

    /// This payment has already been compensated; applying it again would
    /// resurrect a reversed step.
    AlreadyCompensated { balance: Decimal },
}

impl ApplyOutcome {
    /// Returns the account balance observed when the outcome was decided.
    pub fn balance(&self) -> Decimal {
        match self {
            ApplyOutcome::Applied { balance }
            | ApplyOutcome::Duplicate { balance }
            | ApplyOutcome::AlreadyCompensated { balance } => *balance,
        }
    }

    /// Returns true if the balance was changed.
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }
}

/// Result of [`LedgerStore::compensate`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompensationOutcome {
    /// The recorded operation was reversed and its record removed.
    Reversed {
        record: OperationRecord,
        balance: Decimal,
    },

    /// No live record exists for the payment; nothing changed.
    NothingToCompensate,
}

impl CompensationOutcome {
    /// Returns true if a balance was reversed.
    pub fn is_reversed(&self) -> bool {
        matches!(self, CompensationOutcome::Reversed { .. })
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<AccountId, Decimal>,
    operations: HashMap<PaymentId, OperationRecord>,
    /// Never pruned: one entry per compensated payment for the process
    /// lifetime. Size is exported as `ledger_compensated_payments`.
    compensated: HashSet<PaymentId>,
}

impl LedgerState {
    fn balance(&self, account_id: &AccountId) -> Decimal {
        self.balances.get(account_id).copied().unwrap_or_default()
    }
}

/// Thread-safe in-memory ledger.
///
/// Cloning is cheap and yields a handle to the same underlying state, so one
/// store can be shared by every pipeline. `apply` and `compensate` take the
/// write lock for their whole read-modify-write; reads take the read lock.
///
/// Amounts are exact decimals, so reversing an operation restores the prior
/// balance exactly.
///
/// Compensated payment IDs are remembered until the process exits so that a
/// late update for them is refused. Memory therefore grows with the number of
/// compensations; the `ledger_compensated_payments` gauge tracks it.
#[derive(Debug, Clone, Default)]
pub struct LedgerStore {
    state: Arc<RwLock<LedgerState>>,
}

impl LedgerStore {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a forward balance change.
    ///
    /// When `payment_id` is given, an [`OperationRecord`] is kept so the change
    /// can later be compensated. A payment that already has a live record, or
    /// that has been compensated, is not applied a second time.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the new balance is not
    /// representable; nothing is changed in that case.
    #[tracing::instrument(skip(self))]
    pub async fn apply(
        &self,
        account_id: &AccountId,
        amount: Decimal,
        kind: OperationKind,
        payment_id: Option<&PaymentId>,
    ) -> Result<ApplyOutcome> {
        let mut state = self.state.write().await;

        if let Some(payment_id) = payment_id {
            if state.operations.contains_key(payment_id) {
                let balance = state.balance(account_id);
                tracing::warn!(%payment_id, %account_id, "duplicate balance update ignored");
                metrics::counter!("ledger_updates_rejected_total", "reason" => "duplicate")
                    .increment(1);
                return Ok(ApplyOutcome::Duplicate { balance });
            }
            if state.compensated.contains(payment_id) {
                let balance = state.balance(account_id);
                tracing::warn!(%payment_id, %account_id, "update for compensated payment ignored");
                metrics::counter!("ledger_updates_rejected_total", "reason" => "compensated")
                    .increment(1);
                return Ok(ApplyOutcome::AlreadyCompensated { balance });
            }
        }

        let Some(balance) = kind.apply_to(state.balance(account_id), amount) else {
            metrics::counter!("ledger_updates_rejected_total", "reason" => "overflow")
                .increment(1);
            return Err(LedgerError::Overflow {
                account_id: account_id.clone(),
                amount,
            });
        };
        state.balances.insert(account_id.clone(), balance);

        if let Some(payment_id) = payment_id {
            state.operations.insert(
                payment_id.clone(),
                OperationRecord {
                    account_id: account_id.clone(),
                    amount,
                    kind,
                },
            );
        }

        metrics::counter!("ledger_updates_applied_total", "operation" => kind.as_str())
            .increment(1);
        metrics::gauge!("ledger_pending_operations").set(state.operations.len() as f64);
        tracing::info!(
            %account_id,
            payment_id = payment_id.map(PaymentId::as_str).unwrap_or_default(),
            %amount,
            new_balance = %balance,
            "balance updated"
        );

        Ok(ApplyOutcome::Applied { balance })
    }

    /// Reverses the operation recorded for `payment_id`.
    ///
    /// The stored account, amount and kind are authoritative. The record is
    /// removed in the same critical section, so a repeated compensation for
    /// the same payment is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the reversed balance is not
    /// representable. The record is kept so the reversal can be retried.
    #[tracing::instrument(skip(self))]
    pub async fn compensate(&self, payment_id: &PaymentId) -> Result<CompensationOutcome> {
        let mut state = self.state.write().await;

        let Some(record) = state.operations.get(payment_id).cloned() else {
            tracing::info!(%payment_id, "no operation found for compensation");
            metrics::counter!("ledger_compensations_total", "outcome" => "noop").increment(1);
            return Ok(CompensationOutcome::NothingToCompensate);
        };

        let Some(balance) = record.reverse(state.balance(&record.account_id)) else {
            metrics::counter!("ledger_compensations_total", "outcome" => "overflow").increment(1);
            return Err(LedgerError::Overflow {
                account_id: record.account_id,
                amount: record.amount,
            });
        };

        state.operations.remove(payment_id);
        state.balances.insert(record.account_id.clone(), balance);
        state.compensated.insert(payment_id.clone());

        metrics::counter!("ledger_compensations_total", "outcome" => "reversed").increment(1);
        metrics::gauge!("ledger_pending_operations").set(state.operations.len() as f64);
        metrics::gauge!("ledger_compensated_payments").set(state.compensated.len() as f64);
        tracing::info!(
            account_id = %record.account_id,
            %payment_id,
            new_balance = %balance,
            "balance compensated"
        );

        Ok(CompensationOutcome::Reversed { record, balance })
    }

    /// Returns the current balance of an account, zero if never referenced.
    pub async fn get(&self, account_id: &AccountId) -> Decimal {
        self.state.read().await.balance(account_id)
    }

    /// Returns the live operation record for a payment, if any.
    pub async fn operation(&self, payment_id: &PaymentId) -> Option<OperationRecord> {
        self.state.read().await.operations.get(payment_id).cloned()
    }

    /// Returns every known balance, ordered by account.
    pub async fn snapshot(&self) -> BTreeMap<AccountId, Decimal> {
        let state = self.state.read().await;
        state
            .balances
            .iter()
            .map(|(id, balance)| (id.clone(), *balance))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn acc(id: &str) -> AccountId {
        AccountId::new(id)
    }

    fn pay(id: &str) -> PaymentId {
        PaymentId::new(id)
    }

    #[tokio::test]
    async fn test_unseen_account_has_zero_balance() {
        let store = LedgerStore::new();
        assert_eq!(store.get(&acc("nobody")).await, Decimal::ZERO);
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_debit_then_credit_then_compensate_first() {
        let store = LedgerStore::new();
        let a1 = acc("a1");

        store
            .apply(&a1, dec!(50.00), OperationKind::Debit, Some(&pay("p1")))
            .await
            .unwrap();
        assert_eq!(store.get(&a1).await, dec!(-50));

        store
            .apply(&a1, dec!(20.00), OperationKind::Credit, Some(&pay("p2")))
            .await
            .unwrap();
        assert_eq!(store.get(&a1).await, dec!(-30));

        let outcome = store.compensate(&pay("p1")).await.unwrap();
        assert!(outcome.is_reversed());
        assert_eq!(store.get(&a1).await, dec!(20));
        assert!(store.operation(&pay("p1")).await.is_none());
        assert!(store.operation(&pay("p2")).await.is_some());
    }

    #[tokio::test]
    async fn test_reversal_restores_prior_balance_exactly() {
        let store = LedgerStore::new();
        let a1 = acc("a1");

        store
            .apply(&a1, dec!(0.1), OperationKind::Credit, Some(&pay("p0")))
            .await
            .unwrap();
        let before = store.get(&a1).await;

        store
            .apply(&a1, dec!(0.7), OperationKind::Debit, Some(&pay("p1")))
            .await
            .unwrap();
        assert_eq!(store.get(&a1).await, dec!(-0.6));

        store.compensate(&pay("p1")).await.unwrap();

        assert_eq!(store.get(&a1).await, before);
        assert_eq!(before, dec!(0.1));
    }

    #[tokio::test]
    async fn test_many_small_amounts_reconcile_exactly() {
        let store = LedgerStore::new();
        let a1 = acc("a1");

        for i in 0..10 {
            store
                .apply(&a1, dec!(0.1), OperationKind::Credit, Some(&pay(&format!("p{i}"))))
                .await
                .unwrap();
        }
        assert_eq!(store.get(&a1).await, dec!(1));

        for i in 0..10 {
            store.compensate(&pay(&format!("p{i}"))).await.unwrap();
        }
        assert_eq!(store.get(&a1).await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_compensate_twice_is_idempotent() {
        let store = LedgerStore::new();
        let a1 = acc("a1");
        store
            .apply(&a1, dec!(10), OperationKind::Credit, Some(&pay("p1")))
            .await
            .unwrap();

        store.compensate(&pay("p1")).await.unwrap();
        let after_first = store.get(&a1).await;
        let second = store.compensate(&pay("p1")).await.unwrap();

        assert_eq!(second, CompensationOutcome::NothingToCompensate);
        assert_eq!(store.get(&a1).await, after_first);
        assert_eq!(after_first, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_compensate_unknown_payment_changes_nothing() {
        let store = LedgerStore::new();
        store
            .apply(&acc("a1"), dec!(5), OperationKind::Debit, Some(&pay("p1")))
            .await
            .unwrap();
        let before = store.snapshot().await;

        let outcome = store.compensate(&pay("unknown")).await.unwrap();

        assert_eq!(outcome, CompensationOutcome::NothingToCompensate);
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_apply_without_payment_id_is_not_recorded() {
        let store = LedgerStore::new();
        let a1 = acc("a1");

        let first = store.apply(&a1, dec!(3), OperationKind::Debit, None).await.unwrap();
        let second = store.apply(&a1, dec!(3), OperationKind::Debit, None).await.unwrap();

        assert!(first.is_applied());
        assert!(second.is_applied());
        assert_eq!(second.balance(), dec!(-6));
        assert_eq!(store.get(&a1).await, dec!(-6));
    }

    #[tokio::test]
    async fn test_redelivered_update_is_not_applied_twice() {
        let store = LedgerStore::new();
        let a1 = acc("a1");
        let p1 = pay("p1");

        store
            .apply(&a1, dec!(25), OperationKind::Debit, Some(&p1))
            .await
            .unwrap();
        let outcome = store
            .apply(&a1, dec!(25), OperationKind::Debit, Some(&p1))
            .await
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Duplicate { balance: dec!(-25) });
        assert_eq!(store.get(&a1).await, dec!(-25));
    }

    #[tokio::test]
    async fn test_update_after_compensation_is_rejected() {
        let store = LedgerStore::new();
        let a1 = acc("a1");
        let p1 = pay("p1");

        store
            .apply(&a1, dec!(25), OperationKind::Debit, Some(&p1))
            .await
            .unwrap();
        store.compensate(&p1).await.unwrap();
        let outcome = store
            .apply(&a1, dec!(25), OperationKind::Debit, Some(&p1))
            .await
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::AlreadyCompensated { balance: Decimal::ZERO });
        assert_eq!(store.get(&a1).await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_compensation_before_update_does_not_block_it() {
        let store = LedgerStore::new();
        let a1 = acc("a1");
        let p1 = pay("p1");

        assert!(!store.compensate(&p1).await.unwrap().is_reversed());
        let outcome = store
            .apply(&a1, dec!(7), OperationKind::Credit, Some(&p1))
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(store.get(&a1).await, dec!(7));
    }

    #[tokio::test]
    async fn test_overflowing_update_is_rejected_without_change() {
        let store = LedgerStore::new();
        let a1 = acc("a1");
        store
            .apply(&a1, Decimal::MAX, OperationKind::Credit, None)
            .await
            .unwrap();

        let err = store
            .apply(&a1, dec!(1), OperationKind::Credit, Some(&pay("p1")))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            LedgerError::Overflow {
                account_id: a1.clone(),
                amount: dec!(1),
            }
        );
        assert_eq!(store.get(&a1).await, Decimal::MAX);
        assert!(store.operation(&pay("p1")).await.is_none());
    }

    #[tokio::test]
    async fn test_overflowing_reversal_keeps_record() {
        let store = LedgerStore::new();
        let a1 = acc("a1");
        store
            .apply(&a1, dec!(1), OperationKind::Debit, Some(&pay("p1")))
            .await
            .unwrap();
        store
            .apply(&a1, Decimal::MAX, OperationKind::Credit, None)
            .await
            .unwrap();
        store
            .apply(&a1, dec!(1), OperationKind::Credit, None)
            .await
            .unwrap();
        assert_eq!(store.get(&a1).await, Decimal::MAX);

        assert!(store.compensate(&pay("p1")).await.is_err());
        assert!(store.operation(&pay("p1")).await.is_some());
        assert_eq!(store.get(&a1).await, Decimal::MAX);
    }

    #[tokio::test]
    async fn test_compensation_uses_recorded_account() {
        let store = LedgerStore::new();
        store
            .apply(&acc("a1"), dec!(40), OperationKind::Debit, Some(&pay("p1")))
            .await
            .unwrap();
        store
            .apply(&acc("a2"), dec!(10), OperationKind::Credit, Some(&pay("p2")))
            .await
            .unwrap();

        let outcome = store.compensate(&pay("p1")).await.unwrap();

        match outcome {
            CompensationOutcome::Reversed { record, balance } => {
                assert_eq!(record.account_id, acc("a1"));
                assert_eq!(record.amount, dec!(40));
                assert_eq!(balance, Decimal::ZERO);
            }
            other => panic!("expected reversal, got {other:?}"),
        }
        assert_eq!(store.get(&acc("a2")).await, dec!(10));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = LedgerStore::new();
        let handle = store.clone();

        store
            .apply(&acc("a1"), dec!(1.5), OperationKind::Credit, None)
            .await
            .unwrap();

        assert_eq!(handle.get(&acc("a1")).await, dec!(1.5));
    }
}
