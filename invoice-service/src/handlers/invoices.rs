use crate::dtos::{CreateInvoiceRequest, CreateInvoiceResponse, InvoiceResponse};
use crate::messages;
use crate::middleware::AuthenticatedUser;
use crate::startup::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use service_core::error::AppError;
use service_core::extract::ValidatedJson;
use service_core::response::ApiResponse;

/// `POST /payment/invoice`
pub async fn create_invoice(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateInvoiceRequest>,
) -> Result<ApiResponse<CreateInvoiceResponse>, AppError> {
    let created = state
        .lifecycle
        .create_invoice(user.user_id, &user.email, request)
        .await?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        messages::INVOICE_CREATED,
        created,
    ))
}

/// `GET /payment/invoice`
pub async fn list_invoices(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<InvoiceResponse>>, AppError> {
    let invoices = state.lifecycle.list_for_user(user.user_id).await?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        messages::INVOICE_RETRIEVED,
        invoices.into_iter().map(InvoiceResponse::from).collect(),
    ))
}

/// `DELETE /payment/invoice/:id`, where `id` is the gateway invoice id.
pub async fn delete_invoice(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(gateway_id): Path<String>,
) -> Result<ApiResponse<bool>, AppError> {
    let deleted = state
        .lifecycle
        .delete_invoice(user.user_id, &gateway_id)
        .await?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        messages::INVOICE_DELETED,
        deleted,
    ))
}
