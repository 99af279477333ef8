//! # REST API for Orders
//!
//! Looking up an order and paying it. Payment drives the contract and room
//! forward; see `BillingService::pay_order`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use shared::PayOrderRequest;
use tracing::info;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:id", get(get_order)).route("/:id/pay", post(pay_order))
}

pub async fn get_order(State(state): State<AppState>, Path(order_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/orders/{}", order_id);

    match state.billing_service.get_order(&order_id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn pay_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<PayOrderRequest>,
) -> impl IntoResponse {
    info!("POST /api/orders/{}/pay - method: {}", order_id, request.payment_method);

    match state.billing_service.pay_order(&order_id, request).await {
        Ok(paid) => (StatusCode::OK, Json(paid)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::TestEnvironment;
    use crate::test_app::{body_json, state};
    use chrono::NaiveDate;
    use shared::{OrderType, PayOrderResponse, PaymentMethod, TransactionStatus};

    #[tokio::test]
    async fn test_pay_order_once() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        let job = env.seed_job(&env.rooms[0], &tenant, NaiveDate::from_ymd_opt(2024, 3, 16).unwrap(), 6).await;
        let order = env.seed_order(&job, OrderType::Deposit, 1_500_000.0).await;
        let app = state(&env);

        let request = PayOrderRequest {
            payment_method: PaymentMethod::Banking,
            key_payment: Some("CK-7".to_string()),
            bank_id: Some(env.bank.id.clone()),
        };
        let response = pay_order(State(app.clone()), Path(order.id.clone()), Json(request.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let paid: PayOrderResponse = body_json(response).await;
        assert!(paid.order.is_completed);
        assert_eq!(paid.transaction.status, TransactionStatus::Success);

        let response = pay_order(State(app), Path(order.id.clone()), Json(request)).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let env = TestEnvironment::new().await;
        let response = get_order(State(state(&env)), Path("missing".to_string())).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
