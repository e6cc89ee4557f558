//! In-process invoice store for tests and local runs without PostgreSQL.

use crate::messages;
use crate::models::{Invoice, InvoiceReconciliation, NewInvoice};
use crate::services::store::{InvoiceStore, Reconciled};
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Each operation runs inside one critical section, which gives the same
/// single-active-invoice guarantee as the partial unique index in PostgreSQL.
#[derive(Default)]
pub struct MemoryInvoiceStore {
    invoices: Mutex<Vec<Invoice>>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row, deleted ones included.
    pub async fn all(&self) -> Vec<Invoice> {
        self.invoices.lock().await.clone()
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn find_active_by_order(&self, order_id: &str) -> Result<Option<Invoice>, AppError> {
        let invoices = self.invoices.lock().await;
        Ok(invoices
            .iter()
            .find(|i| i.order_id == order_id && i.is_active())
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        let invoices = self.invoices.lock().await;
        Ok(invoices.iter().find(|i| i.id == id).cloned())
    }

    async fn insert(&self, invoice: &NewInvoice) -> Result<Invoice, AppError> {
        let mut invoices = self.invoices.lock().await;

        if invoice.status == crate::models::InvoiceStatus::Pending
            && invoices
                .iter()
                .any(|i| i.order_id == invoice.order_id && i.is_active())
        {
            return Err(AppError::Conflict(
                messages::INVOICE_ALREADY_EXISTS,
                anyhow::anyhow!(
                    "Active invoice already exists for order {}",
                    invoice.order_id
                ),
            ));
        }

        let now = Utc::now();
        let stored = Invoice {
            id: Uuid::new_v4(),
            order_id: invoice.order_id.clone(),
            user_id: invoice.user_id,
            gateway_id: invoice.gateway_id.clone(),
            amount: invoice.amount,
            payment_method: invoice.payment_method.clone(),
            payment_channel: None,
            payer_email: invoice.payer_email.clone(),
            description: invoice.description.clone(),
            status: invoice.status,
            invoice_url: invoice.invoice_url.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        invoices.push(stored.clone());
        Ok(stored)
    }

    async fn reconcile_pending(
        &self,
        order_id: &str,
        update: &InvoiceReconciliation,
    ) -> Result<Option<Reconciled>, AppError> {
        let mut invoices = self.invoices.lock().await;

        let Some(row) = invoices.iter_mut().find(|i| {
            i.order_id == order_id && i.gateway_id == update.gateway_id && i.is_active()
        }) else {
            return Ok(None);
        };

        let before = row.clone();
        row.status = update.status;
        row.description = update.description.clone();
        row.payment_method = Some(update.payment_method.clone());
        row.payment_channel = Some(update.payment_channel.clone());
        row.payer_email = update.payer_email.clone();
        row.updated_at = Utc::now();

        Ok(Some(Reconciled {
            before,
            after: row.clone(),
        }))
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let invoices = self.invoices.lock().await;
        let mut listed: Vec<Invoice> = invoices
            .iter()
            .filter(|i| i.user_id == user_id && i.deleted_at.is_none())
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn exists_for_user(&self, user_id: Uuid, gateway_id: &str) -> Result<bool, AppError> {
        let invoices = self.invoices.lock().await;
        Ok(invoices
            .iter()
            .any(|i| i.user_id == user_id && i.gateway_id == gateway_id && i.deleted_at.is_none()))
    }

    async fn soft_delete(&self, user_id: Uuid, gateway_id: &str) -> Result<u64, AppError> {
        let mut invoices = self.invoices.lock().await;
        let now = Utc::now();
        let mut affected = 0;
        for invoice in invoices.iter_mut().filter(|i| {
            i.user_id == user_id && i.gateway_id == gateway_id && i.deleted_at.is_none()
        }) {
            invoice.deleted_at = Some(now);
            invoice.updated_at = now;
            affected += 1;
        }
        if affected == 0 {
            warn!(%user_id, gateway_id, "Soft delete matched no invoice");
        }
        Ok(affected)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
