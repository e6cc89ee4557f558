//! Request and response bodies for the invoice endpoints.

use crate::models::{Invoice, InvoiceStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Largest amount the `NUMERIC(18, 2)` column holds.
const MAX_AMOUNT: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 2);

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if !amount.is_sign_positive() || amount.is_zero() {
        let mut err = ValidationError::new("positive_amount");
        err.message = Some("amount must be greater than 0".into());
        return Err(err);
    }
    if amount.normalize().scale() > 2 {
        let mut err = ValidationError::new("amount_scale");
        err.message = Some("amount must have at most 2 decimal places".into());
        return Err(err);
    }
    if *amount > MAX_AMOUNT {
        let mut err = ValidationError::new("amount_range");
        err.message = Some("amount is too large".into());
        return Err(err);
    }
    Ok(())
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("not_blank");
        err.message = Some("must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, max = 255), custom(function = validate_not_blank))]
    pub order_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom(function = validate_positive_amount))]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 1000), custom(function = validate_not_blank))]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoiceResponse {
    pub id: Uuid,
    pub order_id: String,
    pub gateway_id: String,
    pub invoice_url: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: InvoiceStatus,
}

impl From<&Invoice> for CreateInvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id,
            order_id: invoice.order_id.clone(),
            gateway_id: invoice.gateway_id.clone(),
            invoice_url: invoice.invoice_url.clone(),
            amount: invoice.amount,
            status: invoice.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub order_id: String,
    pub gateway_id: String,
    pub invoice_url: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub payer_email: String,
    pub description: String,
    pub payment_method: Option<String>,
    pub payment_channel: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            order_id: invoice.order_id,
            gateway_id: invoice.gateway_id,
            invoice_url: invoice.invoice_url,
            amount: invoice.amount,
            status: invoice.status,
            payer_email: invoice.payer_email,
            description: invoice.description,
            payment_method: invoice.payment_method,
            payment_channel: invoice.payment_channel,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

/// Invoice callback body sent by Xendit. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct XenditCallbackPayload {
    #[validate(length(min = 1))]
    pub id: String,
    /// Our order id.
    #[validate(length(min = 1))]
    pub external_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom(function = validate_positive_amount))]
    pub amount: Decimal,
    #[validate(length(min = 1))]
    pub status: String,
    #[validate(email)]
    pub payer_email: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1))]
    pub payment_method: String,
    #[validate(length(min = 1))]
    pub payment_channel: String,
}
