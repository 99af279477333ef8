//! # REST API for Bank Accounts
//!
//! The accounts that receive rent, chosen when a contract is entered.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use shared::CreateBankingRequest;
use tracing::info;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_bankings).post(create_banking))
}

pub async fn create_banking(
    State(state): State<AppState>,
    Json(request): Json<CreateBankingRequest>,
) -> impl IntoResponse {
    info!("POST /api/bankings - bank: {}", request.bank_name);

    match state.motel_service.create_banking(request).await {
        Ok(banking) => (StatusCode::CREATED, Json(banking)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_bankings(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/bankings");

    match state.motel_service.list_bankings().await {
        Ok(bankings) => (StatusCode::OK, Json(bankings)).into_response(),
        Err(e) => e.into_response(),
    }
}
