//! Balance inspection endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::AccountId;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::AppState;

/// `balance` serializes as a decimal string, e.g. `"-50.00"`.
#[derive(Serialize)]
pub struct BalanceResponse {
    pub account_id: String,
    pub balance: Decimal,
}

/// GET /accounts/{account_id}/balance — current balance, zero if unseen.
#[tracing::instrument(skip(state))]
pub async fn balance(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Json<BalanceResponse> {
    let balance = state.ledger.get(&AccountId::new(account_id.as_str())).await;
    Json(BalanceResponse {
        account_id,
        balance,
    })
}

/// GET /accounts — every known balance, ordered by account.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<BalanceResponse>> {
    let balances = state
        .ledger
        .snapshot()
        .await
        .into_iter()
        .map(|(account_id, balance)| BalanceResponse {
            account_id: account_id.to_string(),
            balance,
        })
        .collect();
    Json(balances)
}
