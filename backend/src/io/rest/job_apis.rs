//! # REST API for Contracts
//!
//! Contract lookup, the tenant's activation step and the orders billed
//! against a contract.

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
pub struct JobListQuery {
    pub user_id: Option<String>,
    pub room_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs))
        .route("/:id", get(get_job))
        .route("/:id/active", put(activate_job))
        .route("/:id/orders", get(list_orders))
}

pub async fn list_jobs(State(state): State<AppState>, Query(query): Query<JobListQuery>) -> impl IntoResponse {
    info!("GET /api/jobs - query: {:?}", query);

    match state.billing_service.list_jobs(query.user_id.as_deref(), query.room_id.as_deref()).await {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// A contract with all of its orders
pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/jobs/{}", job_id);

    match state.billing_service.get_job(&job_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn activate_job(State(state): State<AppState>, Path(job_id): Path<String>) -> impl IntoResponse {
    info!("PUT /api/jobs/{}/active", job_id);

    match state.tenancy_service.activate_job(&job_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_orders(State(state): State<AppState>, Path(job_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/jobs/{}/orders", job_id);

    match state.billing_service.list_orders(&job_id).await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => e.into_response(),
    }
}
