//! # REST API for Payment Records

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use tracing::info;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListQuery {
    pub user_id: Option<String>,
    pub room_id: Option<String>,
    /// Order type name: `deposit`, `afterCheckInCost` or `monthly`
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions))
        .route("/:id/cancel", put(cancel_transaction))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> impl IntoResponse {
    info!("GET /api/transactions - query: {:?}", query);

    let TransactionListQuery { user_id, room_id, transaction_type } = query;
    match state
        .transaction_service
        .list_transactions(user_id, room_id, transaction_type.as_deref())
        .await
    {
        Ok(transactions) => (StatusCode::OK, Json(transactions)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn cancel_transaction(State(state): State<AppState>, Path(transaction_id): Path<String>) -> impl IntoResponse {
    info!("PUT /api/transactions/{}/cancel", transaction_id);

    match state.transaction_service.cancel_transaction(&transaction_id).await {
        Ok(transaction) => (StatusCode::OK, Json(transaction)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::TestEnvironment;
    use crate::test_app::{body_json, state};
    use chrono::NaiveDate;
    use shared::{OrderType, PayOrderRequest, Transaction};

    #[tokio::test]
    async fn test_list_and_cancel() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        let job = env.seed_job(&env.rooms[0], &tenant, NaiveDate::from_ymd_opt(2024, 3, 16).unwrap(), 6).await;
        let order = env.seed_order(&job, OrderType::Deposit, 1_500_000.0).await;
        let paid = env.billing_service().pay_order(&order.id, PayOrderRequest::default()).await.unwrap();
        let app = state(&env);

        let query = TransactionListQuery { transaction_type: Some("deposit".to_string()), ..Default::default() };
        let listed: Vec<Transaction> = body_json(list_transactions(State(app.clone()), Query(query)).await.into_response()).await;
        assert_eq!(listed.len(), 1);

        let response = cancel_transaction(State(app.clone()), Path(paid.transaction.id.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let query = TransactionListQuery { transaction_type: Some("refund".to_string()), ..Default::default() };
        let response = list_transactions(State(app), Query(query)).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
