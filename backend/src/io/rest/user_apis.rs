//! # REST API for Users
//!
//! Sign-up, lookup, locking and the per-user notification feed.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use shared::{LockUserRequest, SignUpRequest};
use tracing::info;

use crate::AppState;

/// Create a router for user related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(sign_up))
        .route("/:id", get(get_user))
        .route("/:id/lock", put(lock_user))
        .route("/:id/notifications", get(list_notifications))
}

pub async fn sign_up(State(state): State<AppState>, Json(request): Json<SignUpRequest>) -> impl IntoResponse {
    info!("POST /api/users - phone: {}", request.phone_number);

    match state.account_service.sign_up(request).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_user(State(state): State<AppState>, Path(user_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/users/{}", user_id);

    match state.account_service.get_user(&user_id).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Lock or unlock an account. Locked tenants cannot take new contracts.
pub async fn lock_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<LockUserRequest>,
) -> impl IntoResponse {
    info!("PUT /api/users/{}/lock - locked: {}", user_id, request.locked);

    match state.account_service.set_locked(&user_id, request.locked).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_notifications(State(state): State<AppState>, Path(user_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/users/{}/notifications", user_id);

    match state.notification_service.list_for_user(&user_id).await {
        Ok(notifications) => (StatusCode::OK, Json(notifications)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::TestEnvironment;
    use crate::test_app::{body_json, state};
    use shared::User;

    fn sign_up_request(phone: &str) -> SignUpRequest {
        SignUpRequest {
            first_name: "Bình".to_string(),
            last_name: "Trần".to_string(),
            phone_number: phone.to_string(),
            email: "binh@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            roles: vec![],
            address: None,
        }
    }

    #[tokio::test]
    async fn test_sign_up_then_lock() {
        let env = TestEnvironment::new().await;
        let app = state(&env);

        let response = sign_up(State(app.clone()), Json(sign_up_request("0977111222"))).await.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let user: User = body_json(response).await;

        let response = lock_user(State(app.clone()), Path(user.id.clone()), Json(LockUserRequest { locked: true }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let locked: User = body_json(response).await;
        assert!(locked.is_locked);
    }

    #[tokio::test]
    async fn test_bad_sign_up_and_unknown_user() {
        let env = TestEnvironment::new().await;
        let app = state(&env);

        let response = sign_up(State(app.clone()), Json(sign_up_request("12"))).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = get_user(State(app), Path("missing".to_string())).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
