use crate::dtos::InvoiceResponse;
use crate::messages;
use crate::startup::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use service_core::error::AppError;
use service_core::response::ApiResponse;

pub const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

/// `POST /payment/xendit/callback`
///
/// Takes the raw body so nothing is parsed before the token is checked.
pub async fn xendit_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<InvoiceResponse>, AppError> {
    let token = headers
        .get(CALLBACK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    let invoice = state.reconciler.handle_callback(token, &body).await?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        messages::INVOICE_UPDATED,
        InvoiceResponse::from(invoice),
    ))
}
