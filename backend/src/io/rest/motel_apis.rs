//! # REST API for Buildings

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use shared::CreateMotelRequest;
use tracing::info;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotelListQuery {
    pub owner_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_motels).post(create_motel))
        .route("/:id", get(get_motel))
}

pub async fn create_motel(State(state): State<AppState>, Json(request): Json<CreateMotelRequest>) -> impl IntoResponse {
    info!("POST /api/motels - name: {}", request.name);

    match state.motel_service.create_motel(request).await {
        Ok(motel) => (StatusCode::CREATED, Json(motel)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_motels(State(state): State<AppState>, Query(query): Query<MotelListQuery>) -> impl IntoResponse {
    info!("GET /api/motels - query: {:?}", query);

    match state.motel_service.list_motels(query.owner_id.as_deref()).await {
        Ok(motels) => (StatusCode::OK, Json(motels)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// A building with its floors
pub async fn get_motel(State(state): State<AppState>, Path(motel_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/motels/{}", motel_id);

    match state.motel_service.get_motel(&motel_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::TestEnvironment;
    use crate::test_app::{body_json, state};
    use shared::MotelRoom;

    #[tokio::test]
    async fn test_list_by_owner() {
        let env = TestEnvironment::new().await;
        let app = state(&env);

        let query = MotelListQuery { owner_id: Some(env.owner.id.clone()) };
        let motels: Vec<MotelRoom> = body_json(list_motels(State(app.clone()), Query(query)).await.into_response()).await;
        assert_eq!(motels.len(), 1);
        assert_eq!(motels[0].counters.total_room, 3);

        let query = MotelListQuery { owner_id: Some("someone-else".to_string()) };
        let motels: Vec<MotelRoom> = body_json(list_motels(State(app), Query(query)).await.into_response()).await;
        assert!(motels.is_empty());
    }

    #[tokio::test]
    async fn test_create_motel_for_unknown_owner() {
        let env = TestEnvironment::new().await;
        let request = CreateMotelRequest {
            name: "Nhà trọ mới".to_string(),
            address: String::new(),
            owner_id: "missing".to_string(),
        };
        let response = create_motel(State(state(&env)), Json(request)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
