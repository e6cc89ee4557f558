//! Request extractors that reject with [`AppError`] instead of axum's plain-text rejections.

use crate::error::AppError;
use crate::response::messages;
use axum::{
    Json, async_trait,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body that is deserialized and then validated with `validator`.
///
/// Malformed or incomplete bodies become `AppError::BadRequest`; field rule
/// violations become `AppError::ValidationError`. Both render as 400.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::warn!(error = %rejection.body_text(), "Rejected request body");
            AppError::BadRequest(
                messages::INVALID_REQUEST_DATA,
                anyhow::anyhow!(rejection.body_text()),
            )
        })?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}
