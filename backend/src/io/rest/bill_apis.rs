//! # REST API for Bills

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::info;

use crate::domain::MotelError;
use crate::io::rest::error::attachment;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillListQuery {
    pub motel_id: Option<String>,
    pub user_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bills))
        .route("/export", get(export_bills))
        .route("/:id", get(get_bill))
}

pub async fn list_bills(State(state): State<AppState>, Query(query): Query<BillListQuery>) -> impl IntoResponse {
    info!("GET /api/bills - query: {:?}", query);

    match state
        .transaction_service
        .list_bills(query.motel_id.as_deref(), query.user_id.as_deref())
        .await
    {
        Ok(bills) => (StatusCode::OK, Json(bills)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_bill(State(state): State<AppState>, Path(bill_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/bills/{}", bill_id);

    match state.transaction_service.get_bill(&bill_id).await {
        Ok(bill) => (StatusCode::OK, Json(bill)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// A building's bills as CSV
pub async fn export_bills(State(state): State<AppState>, Query(query): Query<BillListQuery>) -> impl IntoResponse {
    info!("GET /api/bills/export - query: {:?}", query);

    let Some(motel_id) = query.motel_id else {
        return MotelError::validation("Thiếu mã tòa nhà").into_response();
    };
    match state.export_service.export_bills_csv(&motel_id).await {
        Ok(file) => attachment(StatusCode::OK, &file.filename, file.content_type, file.bytes),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::TestEnvironment;
    use crate::test_app::{body_json, state};
    use axum::body::to_bytes;
    use axum::http::header;
    use chrono::NaiveDate;
    use shared::{Bill, OrderType, PayOrderRequest};

    #[tokio::test]
    async fn test_list_get_and_export() {
        let env = TestEnvironment::new().await;
        let tenant = env.tenant().await;
        let job = env.seed_job(&env.rooms[0], &tenant, NaiveDate::from_ymd_opt(2024, 3, 16).unwrap(), 6).await;
        let order = env.seed_order(&job, OrderType::Deposit, 1_500_000.0).await;
        env.billing_service().pay_order(&order.id, PayOrderRequest::default()).await.unwrap();
        let app = state(&env);

        let query = BillListQuery { motel_id: Some(env.motel.id.clone()), user_id: None };
        let bills: Vec<Bill> = body_json(list_bills(State(app.clone()), Query(query)).await.into_response()).await;
        assert_eq!(bills.len(), 1);

        let bill: Bill = body_json(get_bill(State(app.clone()), Path(bills[0].id.clone())).await.into_response()).await;
        assert_eq!(bill.id_bill, order.key_order);

        let query = BillListQuery { motel_id: Some(env.motel.id.clone()), user_id: None };
        let response = export_bills(State(app.clone()), Query(query)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(String::from_utf8(body.to_vec()).unwrap().lines().count(), 2);

        let response = export_bills(State(app), Query(BillListQuery::default())).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
