//! # REST API for Floors

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use shared::CreateFloorRequest;
use tracing::info;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_floor)).route("/:id", get(get_floor))
}

pub async fn create_floor(State(state): State<AppState>, Json(request): Json<CreateFloorRequest>) -> impl IntoResponse {
    info!("POST /api/floors - building: {}", request.motel_id);

    match state.floor_service.create_floor(request).await {
        Ok(floor) => (StatusCode::CREATED, Json(floor)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// A floor with its rooms
pub async fn get_floor(State(state): State<AppState>, Path(floor_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/floors/{}", floor_id);

    match state.floor_service.get_floor(&floor_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}
