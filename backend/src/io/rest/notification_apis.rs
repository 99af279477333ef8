//! # REST API for Notifications

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::put,
    Router,
};
use tracing::info;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/read", put(mark_read))
}

pub async fn mark_read(State(state): State<AppState>, Path(notification_id): Path<String>) -> impl IntoResponse {
    info!("PUT /api/notifications/{}/read", notification_id);

    match state.notification_service.mark_read(&notification_id).await {
        Ok(notification) => (StatusCode::OK, Json(notification)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::TestEnvironment;
    use crate::test_app::state;

    #[tokio::test]
    async fn test_unknown_notification_is_not_found() {
        let env = TestEnvironment::new().await;
        let response = mark_read(State(state(&env)), Path("missing".to_string())).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
