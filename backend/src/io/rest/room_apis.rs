//! # REST API for Rooms
//!
//! Room inventory, the admin status override, electricity readings and the
//! available-rooms workbook used to prepare bulk imports.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use shared::{ChangeRoomStatusRequest, CreateRoomRequest, RecordReadingRequest, UpdateRoomRequest, UpdateUtilitiesRequest};
use tracing::info;

use crate::io::rest::error::attachment;
use crate::AppState;

/// Create a router for room related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_room))
        .route("/:id", get(get_room).put(edit_room).delete(delete_room))
        .route("/:id/status", put(change_status))
        .route("/:id/utilities", put(update_utilities))
        .route("/:id/available-rooms/export", get(export_available_rooms))
        .route("/:id/electricity-readings", post(record_reading))
}

pub async fn create_room(State(state): State<AppState>, Json(request): Json<CreateRoomRequest>) -> impl IntoResponse {
    info!("POST /api/rooms - floor: {}, name: {}", request.floor_id, request.name);

    match state.room_service.create_room(request).await {
        Ok(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_room(State(state): State<AppState>, Path(room_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/rooms/{}", room_id);

    match state.room_service.get_room(&room_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn edit_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<UpdateRoomRequest>,
) -> impl IntoResponse {
    info!("PUT /api/rooms/{}", room_id);

    match state.room_service.edit_room(&room_id, request).await {
        Ok(room) => (StatusCode::OK, Json(room)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete a room that never had a contract. Returns the recounted building.
pub async fn delete_room(State(state): State<AppState>, Path(room_id): Path<String>) -> impl IntoResponse {
    info!("DELETE /api/rooms/{}", room_id);

    match state.room_service.delete_room(&room_id).await {
        Ok(motel) => (StatusCode::OK, Json(motel)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn change_status(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<ChangeRoomStatusRequest>,
) -> impl IntoResponse {
    info!("PUT /api/rooms/{}/status - status: {}", room_id, request.status);

    match state.room_service.change_status(&room_id, &request.status).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_utilities(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<UpdateUtilitiesRequest>,
) -> impl IntoResponse {
    info!("PUT /api/rooms/{}/utilities", room_id);

    match state.room_service.update_utilities(&room_id, request).await {
        Ok(room) => (StatusCode::OK, Json(room)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Workbook of the available rooms in the same building
pub async fn export_available_rooms(State(state): State<AppState>, Path(room_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/rooms/{}/available-rooms/export", room_id);

    match state.export_service.export_available_rooms(&room_id).await {
        Ok(file) => attachment(StatusCode::OK, &file.filename, file.content_type, file.bytes),
        Err(e) => e.into_response(),
    }
}

pub async fn record_reading(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<RecordReadingRequest>,
) -> impl IntoResponse {
    info!("POST /api/rooms/{}/electricity-readings - value: {}", room_id, request.value);

    match state.room_service.record_reading(&room_id, request).await {
        Ok(reading) => (StatusCode::CREATED, Json(reading)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Rooms of an owner's buildings with their current contract and tenant
pub async fn list_rented_rooms(State(state): State<AppState>, Path(owner_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/owners/{}/rented-rooms", owner_id);

    match state.room_service.list_rented_rooms(&owner_id).await {
        Ok(rooms) => (StatusCode::OK, Json(rooms)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spreadsheet::XLSX_CONTENT_TYPE;
    use crate::domain::test_support::TestEnvironment;
    use crate::test_app::{body_json, state};
    use axum::http::header;
    use chrono::NaiveDate;
    use shared::{ElectricityReading, RoomDetail, RoomStatus};

    #[tokio::test]
    async fn test_create_and_get_room() {
        let env = TestEnvironment::new().await;
        let app = state(&env);

        let request = CreateRoomRequest {
            floor_id: env.floor.id.clone(),
            name: "104".to_string(),
            price: 2_800_000.0,
            ..Default::default()
        };
        let response = create_room(State(app.clone()), Json(request)).await.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: RoomDetail = body_json(response).await;

        let fetched: RoomDetail = body_json(get_room(State(app), Path(created.room.id.clone())).await.into_response()).await;
        assert_eq!(fetched.room.key, "B1-F1-R4");
        assert_eq!(fetched.motel_id, env.motel.id);
    }

    #[tokio::test]
    async fn test_status_override() {
        let env = TestEnvironment::new().await;
        let app = state(&env);

        let request = ChangeRoomStatusRequest { status: "deposited".to_string() };
        let response = change_status(State(app.clone()), Path(env.rooms[0].id.clone()), Json(request))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let detail: RoomDetail = body_json(response).await;
        assert_eq!(detail.room.status, RoomStatus::Deposited);

        let request = ChangeRoomStatusRequest { status: "archived".to_string() };
        let response = change_status(State(app), Path(env.rooms[0].id.clone()), Json(request)).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_is_an_xlsx_attachment() {
        let env = TestEnvironment::new().await;
        let response = export_available_rooms(State(state(&env)), Path(env.rooms[0].id.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains("Rooms%20-%20available.xlsx"));
    }

    #[tokio::test]
    async fn test_record_reading_and_delete() {
        let env = TestEnvironment::new().await;
        let app = state(&env);

        let request = RecordReadingRequest { reading_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), value: 1250.0 };
        let response = record_reading(State(app.clone()), Path(env.rooms[2].id.clone()), Json(request))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let reading: ElectricityReading = body_json(response).await;
        assert_eq!(reading.value, 1250.0);

        let response = delete_room(State(app.clone()), Path(env.rooms[2].id.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let response = get_room(State(app), Path(env.rooms[2].id.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
