//! Concurrency tests for the ledger store.
//!
//! Forward updates and compensations are issued from independent tasks on a
//! multi-threaded runtime. The final balances are checked against a reference
//! computed from the outcomes each task observed, which holds for any
//! serialization of the operations. Amounts are tenths, which a binary float
//! could not sum exactly.

use ledger::{AccountId, ApplyOutcome, CompensationOutcome, LedgerStore, OperationKind, PaymentId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::task::JoinSet;

const ACCOUNTS: usize = 4;
const OPERATIONS: usize = 2_000;

fn account_for(i: usize) -> AccountId {
    AccountId::new(format!("acc-{}", i % ACCOUNTS))
}

fn kind_for(i: usize) -> OperationKind {
    if i % 3 == 0 {
        OperationKind::Credit
    } else {
        OperationKind::Debit
    }
}

fn amount_for(i: usize) -> Decimal {
    Decimal::from((i % 17) as u64 + 1) * dec!(0.1)
}

fn signed(kind: OperationKind, amount: Decimal) -> Decimal {
    kind.apply_to(Decimal::ZERO, amount).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_apply_and_compensate_has_no_lost_updates() {
    let store = LedgerStore::new();
    let mut updates = JoinSet::new();
    let mut compensations = JoinSet::new();

    for i in 0..OPERATIONS {
        let update_store = store.clone();
        updates.spawn(async move {
            let payment_id = PaymentId::new(format!("pay-{i}"));
            let outcome = update_store
                .apply(&account_for(i), amount_for(i), kind_for(i), Some(&payment_id))
                .await
                .unwrap();
            (i, outcome)
        });

        if i % 2 == 0 {
            let store = store.clone();
            compensations.spawn(async move {
                let payment_id = PaymentId::new(format!("pay-{i}"));
                (i, store.compensate(&payment_id).await.unwrap())
            });
        }
    }

    let mut expected = vec![Decimal::ZERO; ACCOUNTS];

    while let Some(result) = updates.join_next().await {
        let (i, outcome) = result.unwrap();
        assert!(outcome.is_applied(), "payment {i} should apply exactly once");
        expected[i % ACCOUNTS] += signed(kind_for(i), amount_for(i));
    }

    while let Some(result) = compensations.join_next().await {
        let (i, outcome) = result.unwrap();
        if let CompensationOutcome::Reversed { record, .. } = outcome {
            assert_eq!(record.account_id, account_for(i));
            assert_eq!(record.amount, amount_for(i));
            expected[i % ACCOUNTS] -= signed(kind_for(i), amount_for(i));
        }
    }

    for (n, want) in expected.iter().enumerate() {
        let got = store.get(&AccountId::new(format!("acc-{n}"))).await;
        assert_eq!(got, *want, "balance mismatch for acc-{n}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_unrecorded_updates_sum_exactly() {
    let store = LedgerStore::new();
    let account = AccountId::new("shared");
    let mut tasks = JoinSet::new();

    for i in 0..OPERATIONS {
        let store = store.clone();
        let account = account.clone();
        tasks.spawn(async move {
            store
                .apply(&account, amount_for(i), kind_for(i), None)
                .await
                .unwrap()
        });
    }

    while let Some(result) = tasks.join_next().await {
        assert!(matches!(result.unwrap(), ApplyOutcome::Applied { .. }));
    }

    let expected: Decimal = (0..OPERATIONS)
        .map(|i| signed(kind_for(i), amount_for(i)))
        .sum();
    assert_eq!(store.get(&account).await, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_compensations_reverse_once() {
    let store = LedgerStore::new();
    let account = AccountId::new("a1");
    let payment_id = PaymentId::new("p1");

    store
        .apply(&account, dec!(100), OperationKind::Debit, Some(&payment_id))
        .await
        .unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..32 {
        let store = store.clone();
        let payment_id = payment_id.clone();
        tasks.spawn(async move { store.compensate(&payment_id).await.unwrap() });
    }

    let mut reversed = 0;
    while let Some(result) = tasks.join_next().await {
        if result.unwrap().is_reversed() {
            reversed += 1;
        }
    }

    assert_eq!(reversed, 1);
    assert_eq!(store.get(&account).await, Decimal::ZERO);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_compensation_racing_its_update_is_consistent() {
    for round in 0..200 {
        let store = LedgerStore::new();
        let account = AccountId::new("a1");
        let payment_id = PaymentId::new(format!("p-{round}"));

        let apply = {
            let store = store.clone();
            let account = account.clone();
            let payment_id = payment_id.clone();
            tokio::spawn(async move {
                store
                    .apply(&account, dec!(10), OperationKind::Credit, Some(&payment_id))
                    .await
                    .unwrap()
            })
        };
        let compensate = {
            let store = store.clone();
            let payment_id = payment_id.clone();
            tokio::spawn(async move { store.compensate(&payment_id).await.unwrap() })
        };

        assert!(apply.await.unwrap().is_applied());
        let reversed = compensate.await.unwrap().is_reversed();

        let expected = if reversed { Decimal::ZERO } else { dec!(10) };
        assert_eq!(store.get(&account).await, expected);
        assert_eq!(store.operation(&payment_id).await.is_some(), !reversed);
    }
}
