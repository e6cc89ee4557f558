//! Invoice persistence seam.

use crate::models::{Invoice, InvoiceReconciliation, NewInvoice};
use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

/// Row state on both sides of a reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub before: Invoice,
    pub after: Invoice,
}

/// Durable invoice storage.
///
/// Implementations must enforce at most one active (`PENDING`, not deleted)
/// invoice per `order_id` themselves and report a violation from
/// [`insert`](InvoiceStore::insert) as `AppError::Conflict`. Every write runs
/// in a single transaction.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Active invoice for an order, if any.
    async fn find_active_by_order(&self, order_id: &str) -> Result<Option<Invoice>, AppError>;

    /// Direct lookup by local id. Soft-deleted invoices are returned too.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, AppError>;

    async fn insert(&self, invoice: &NewInvoice) -> Result<Invoice, AppError>;

    /// Apply a callback to the active invoice of `order_id` issued as
    /// `update.gateway_id`. The gateway id itself is never rewritten.
    ///
    /// Returns `None` when no such invoice exists, including when a previous
    /// delivery already moved it out of `PENDING` and when the order's active
    /// invoice was issued under another gateway id.
    async fn reconcile_pending(
        &self,
        order_id: &str,
        update: &InvoiceReconciliation,
    ) -> Result<Option<Reconciled>, AppError>;

    /// Non-deleted invoices of a user, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Invoice>, AppError>;

    async fn exists_for_user(&self, user_id: Uuid, gateway_id: &str) -> Result<bool, AppError>;

    /// Soft-delete; returns rows affected. Zero is not an error.
    async fn soft_delete(&self, user_id: Uuid, gateway_id: &str) -> Result<u64, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
