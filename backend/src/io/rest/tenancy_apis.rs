//! # REST API for Quick Deposit and Quick Rent
//!
//! Single-room contracts entered by an admin, and the spreadsheet uploads
//! that queue many of them at once. Uploads with invalid rows are answered
//! with a workbook listing the problems.

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use shared::QuickContractRequest;
use tracing::{info, warn};

use crate::domain::import_service::ERRORS_FILENAME;
use crate::domain::spreadsheet::XLSX_CONTENT_TYPE;
use crate::domain::{ContractKind, ImportOutcome, MotelError};
use crate::io::rest::error::{acting_user, attachment};
use crate::AppState;

/// Routes merged under `/rooms`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quick-deposit", post(quick_deposit))
        .route("/quick-deposit/bulk", post(bulk_quick_deposit))
        .route("/quick-rent", post(quick_rent))
        .route("/quick-rent/bulk", post(bulk_quick_rent))
}

pub async fn quick_deposit(
    State(state): State<AppState>,
    Json(request): Json<QuickContractRequest>,
) -> impl IntoResponse {
    info!("POST /api/rooms/quick-deposit - room: {}, phone: {}", request.room_id, request.phone_number);

    match state.tenancy_service.quick_deposit(request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn quick_rent(State(state): State<AppState>, Json(request): Json<QuickContractRequest>) -> impl IntoResponse {
    info!("POST /api/rooms/quick-rent - room: {}, phone: {}", request.room_id, request.phone_number);

    match state.tenancy_service.quick_rent(request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn bulk_quick_deposit(State(state): State<AppState>, headers: HeaderMap, multipart: Multipart) -> Response {
    info!("POST /api/rooms/quick-deposit/bulk");
    bulk_import(state, ContractKind::Deposit, headers, multipart).await
}

pub async fn bulk_quick_rent(State(state): State<AppState>, headers: HeaderMap, multipart: Multipart) -> Response {
    info!("POST /api/rooms/quick-rent/bulk");
    bulk_import(state, ContractKind::Rent, headers, multipart).await
}

/// Fields of a bulk upload form
#[derive(Debug, Default)]
struct Upload {
    file: Option<Vec<u8>>,
    bank_id: String,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, MotelError> {
    let mut upload = Upload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MotelError::validation(format!("Dữ liệu tải lên không hợp lệ: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| MotelError::validation(format!("Không đọc được file: {}", e)))?;
                upload.file = Some(bytes.to_vec());
            }
            Some("bankId") => {
                upload.bank_id = field
                    .text()
                    .await
                    .map_err(|e| MotelError::validation(format!("Mã ngân hàng không hợp lệ: {}", e)))?
                    .trim()
                    .to_string();
            }
            other => warn!("Ignoring upload field {:?}", other),
        }
    }
    Ok(upload)
}

async fn bulk_import(state: AppState, kind: ContractKind, headers: HeaderMap, multipart: Multipart) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => return e.into_response(),
    };

    match state.import_service.import(kind, upload.file, &upload.bank_id, acting_user(&headers)).await {
        Ok(ImportOutcome::Accepted(accepted)) => (StatusCode::OK, Json(accepted)).into_response(),
        Ok(ImportOutcome::Rejected { workbook, invalid_rows }) => {
            warn!("Bulk {:?} upload rejected: {} invalid rows", kind, invalid_rows);
            attachment(StatusCode::BAD_REQUEST, ERRORS_FILENAME, XLSX_CONTENT_TYPE, workbook)
        }
        Err(e) => e.into_response(),
    }
}
