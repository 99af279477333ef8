//! # REST API for Scheduled Tasks
//!
//! Read-only view of the task table so an admin can spot failed work.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use shared::TaskStatus;
use tracing::info;

use crate::domain::MotelError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_tasks))
}

pub async fn list_tasks(State(state): State<AppState>, Query(query): Query<TaskListQuery>) -> impl IntoResponse {
    info!("GET /api/tasks - query: {:?}", query);

    let status = match query.status.as_deref().map(str::parse::<TaskStatus>).transpose() {
        Ok(status) => status,
        Err(e) => return MotelError::validation(e.to_string()).into_response(),
    };
    match state.scheduler.list_tasks(status).await {
        Ok(tasks) => (StatusCode::OK, Json(tasks)).into_response(),
        Err(e) => e.into_response(),
    }
}
