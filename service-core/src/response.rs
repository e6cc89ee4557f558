//! Uniform response envelope shared by every HTTP endpoint.
//!
//! Each response carries the HTTP status code, a bilingual message with a
//! stable key, and an optional payload:
//!
//! ```json
//! { "status_code": 201, "message": { "key": "INVOICE_CREATED", "en": "...", "id": "..." }, "data": { } }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// A user-facing message with a stable key and English/Indonesian text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Message {
    pub key: &'static str,
    pub en: &'static str,
    pub id: &'static str,
}

impl Message {
    pub const fn new(key: &'static str, en: &'static str, id: &'static str) -> Self {
        Self { key, en, id }
    }
}

/// Messages shared by all services.
pub mod messages {
    use super::Message;

    pub const INVALID_REQUEST_DATA: Message = Message::new(
        "INVALID_REQUEST_DATA",
        "Invalid request data",
        "Data permintaan tidak valid",
    );
    pub const UNAUTHORIZED_ACCESS: Message = Message::new(
        "UNAUTHORIZED_ACCESS",
        "Unauthorized access",
        "Akses tidak sah",
    );
    pub const INTERNAL_SERVER_ERROR: Message = Message::new(
        "INTERNAL_SERVER_ERROR",
        "Internal server error",
        "Terjadi kesalahan pada server",
    );
}

/// Response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(status: StatusCode, message: Message, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            message,
            data: Some(data),
            errors: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(status: StatusCode, message: Message, errors: Option<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            message,
            data: None,
            errors,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Owned form of the envelope, for clients and tests decoding responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status_code: u16,
    pub message: MessageBody,
    pub data: Option<T>,
    pub errors: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageBody {
    pub key: String,
    pub en: String,
    pub id: String,
}
