//! Error responses and shared response helpers for the REST handlers.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use shared::ErrorBody;
use tracing::{error, warn};

use crate::domain::MotelError;

/// Header carrying the id of the admin acting on the request
pub const USER_ID_HEADER: &str = "x-user-id";

impl IntoResponse for MotelError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            MotelError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            MotelError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            MotelError::Database(_) | MotelError::Internal(_) => {
                error!("Request failed: {:#}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        if status != StatusCode::INTERNAL_SERVER_ERROR {
            warn!("Request rejected ({}): {}", status.as_u16(), message);
        }
        (status, Json(ErrorBody { error: true, message })).into_response()
    }
}

/// The `X-User-Id` header, when present and not blank
pub fn acting_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// A file download. Non-ASCII names go in the RFC 5987 `filename*` parameter.
pub fn attachment(status: StatusCode, filename: &str, content_type: &'static str, bytes: Vec<u8>) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(filename),
        urlencoding::encode(filename)
    );
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    match HeaderValue::from_str(&disposition) {
        Ok(value) => {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        Err(e) => warn!("Dropping Content-Disposition for {}: {}", filename, e),
    }
    (status, headers, bytes).into_response()
}

fn ascii_fallback(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_error_status_and_body() {
        let response = MotelError::validation("Tên phòng không hợp lệ").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert!(body.error);
        assert_eq!(body.message, "Tên phòng không hợp lệ");

        let response = MotelError::not_found("Phòng không tồn tại").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let response = MotelError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.message, "Internal server error");
    }

    #[test]
    fn test_acting_user_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(acting_user(&headers), None);
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  "));
        assert_eq!(acting_user(&headers), None);
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("admin-1"));
        assert_eq!(acting_user(&headers), Some("admin-1".to_string()));
    }

    #[test]
    fn test_attachment_encodes_unicode_filename() {
        let response = attachment(StatusCode::OK, "Nhà trọ - bills.csv", "text/csv; charset=utf-8", b"a,b".to_vec());
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"Nh_ tr_ - bills.csv\""));
        assert!(disposition.ends_with("filename*=UTF-8''Nh%C3%A0%20tr%E1%BB%8D%20-%20bills.csv"));
    }
}
