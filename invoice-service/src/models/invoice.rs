//! Invoice model for invoice-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Invoice status as mirrored from the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Expired,
    Failed,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Expired => "EXPIRED",
            InvoiceStatus::Failed => "FAILED",
        }
    }

    /// Only `PENDING -> PAID | EXPIRED | FAILED` is allowed.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (
                InvoiceStatus::Pending,
                InvoiceStatus::Paid | InvoiceStatus::Expired | InvoiceStatus::Failed
            )
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown invoice status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    /// Case-insensitive. Xendit reports settled invoices as `SETTLED`,
    /// which the local mirror records as `PAID`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(InvoiceStatus::Pending),
            "PAID" | "SETTLED" => Ok(InvoiceStatus::Paid),
            "EXPIRED" => Ok(InvoiceStatus::Expired),
            "FAILED" => Ok(InvoiceStatus::Failed),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Local mirror of a gateway invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub order_id: String,
    pub user_id: Uuid,
    pub gateway_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_method: Option<String>,
    pub payment_channel: Option<String>,
    pub payer_email: String,
    pub description: String,
    pub status: InvoiceStatus,
    pub invoice_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// `PENDING` and not soft-deleted.
    pub fn is_active(&self) -> bool {
        self.status == InvoiceStatus::Pending && self.deleted_at.is_none()
    }
}

/// Input for persisting a freshly issued gateway invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub order_id: String,
    pub user_id: Uuid,
    pub gateway_id: String,
    pub amount: Decimal,
    pub payment_method: Option<String>,
    pub payer_email: String,
    pub description: String,
    pub status: InvoiceStatus,
    pub invoice_url: String,
}

/// Fields a gateway callback overwrites on the matched pending invoice.
#[derive(Debug, Clone)]
pub struct InvoiceReconciliation {
    pub gateway_id: String,
    pub status: InvoiceStatus,
    pub description: String,
    pub payment_method: String,
    pub payment_channel: String,
    pub payer_email: String,
}
