use crate::response::{ApiResponse, Message, messages};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Application error.
///
/// Variants other than `ValidationError`, `InternalError` and `ConfigError`
/// carry the user-facing [`Message`] they map to. Detail from dependency,
/// database and internal failures is logged but never serialized.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {1}")]
    BadRequest(Message, anyhow::Error),

    #[error("Unauthorized: {1}")]
    Unauthorized(Message, anyhow::Error),

    #[error("Not found: {1}")]
    NotFound(Message, anyhow::Error),

    #[error("Conflict: {1}")]
    Conflict(Message, anyhow::Error),

    #[error("Dependency error: {1}")]
    DependencyError(Message, anyhow::Error),

    #[error("Database error: {1}")]
    DatabaseError(Message, anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn database(err: impl Into<anyhow::Error>) -> Self {
        AppError::DatabaseError(messages::INTERNAL_SERVER_ERROR, err.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(..) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(..) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(..) => StatusCode::CONFLICT,
            AppError::DependencyError(..)
            | AppError::DatabaseError(..)
            | AppError::InternalError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> Message {
        match self {
            AppError::ValidationError(_) => messages::INVALID_REQUEST_DATA,
            AppError::BadRequest(msg, _)
            | AppError::Unauthorized(msg, _)
            | AppError::NotFound(msg, _)
            | AppError::Conflict(msg, _)
            | AppError::DependencyError(msg, _)
            | AppError::DatabaseError(msg, _) => *msg,
            AppError::InternalError(_) | AppError::ConfigError(_) => {
                messages::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        let details = match &self {
            AppError::ValidationError(err) => Some(err.to_string()),
            AppError::BadRequest(_, err) => Some(err.to_string()),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, key = message.key, "Request failed");
        } else {
            tracing::debug!(error = %self, key = message.key, "Request rejected");
        }

        ApiResponse::failure(status, message, details).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    const ORDER_MISSING: Message = Message::new("ORDER_NOT_FOUND", "Order not found", "Pesanan tidak ditemukan");

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_carries_its_message_key() {
        let response =
            AppError::NotFound(ORDER_MISSING, anyhow::anyhow!("order O-1 missing")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["status_code"], 404);
        assert_eq!(body["message"]["key"], "ORDER_NOT_FOUND");
        assert_eq!(body["message"]["id"], "Pesanan tidak ditemukan");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn database_detail_is_not_leaked() {
        let response =
            AppError::database(anyhow::anyhow!("connection refused on 10.0.0.3")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"]["key"], "INTERNAL_SERVER_ERROR");
        assert!(body.get("errors").is_none());
        assert!(!body.to_string().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn validation_errors_map_to_bad_request_with_detail() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("amount", validator::ValidationError::new("positive"));

        let response = AppError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["message"]["key"], "INVALID_REQUEST_DATA");
        assert!(body["errors"].as_str().unwrap().contains("amount"));
    }
}
