//! Caller identity forwarded by the upstream gateway.
//!
//! The gateway in front of this service authenticates the user and sets
//! `X-User-ID` and `X-User-Email`. Requests without them are rejected.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use service_core::response::messages;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

fn unauthorized(reason: &'static str) -> AppError {
    tracing::warn!(reason, "Rejected request without caller identity");
    AppError::Unauthorized(messages::UNAUTHORIZED_ACCESS, anyhow::anyhow!(reason))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing X-User-ID header"))?;
        let user_id =
            Uuid::parse_str(user_id.trim()).map_err(|_| unauthorized("Invalid X-User-ID header"))?;

        let email = parts
            .headers
            .get(USER_EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| unauthorized("Missing X-User-Email header"))?;

        tracing::Span::current().record("user_id", tracing::field::display(user_id));

        Ok(Self {
            user_id,
            email: email.to_string(),
        })
    }
}
