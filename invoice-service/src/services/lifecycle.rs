//! Invoice creation, listing and soft delete.

use crate::dtos::{CreateInvoiceRequest, CreateInvoiceResponse};
use crate::messages;
use crate::models::{Invoice, InvoiceStatus, NewInvoice};
use crate::services::metrics::{INVOICES_CREATED_TOTAL, ORPHANED_GATEWAY_INVOICES_TOTAL};
use crate::services::orders::OrderLookup;
use crate::services::store::InvoiceStore;
use crate::services::xendit::{CreateGatewayInvoice, PaymentGateway};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct InvoiceLifecycle {
    store: Arc<dyn InvoiceStore>,
    gateway: Arc<dyn PaymentGateway>,
    orders: Option<Arc<dyn OrderLookup>>,
}

impl InvoiceLifecycle {
    pub fn new(
        store: Arc<dyn InvoiceStore>,
        gateway: Arc<dyn PaymentGateway>,
        orders: Option<Arc<dyn OrderLookup>>,
    ) -> Self {
        Self {
            store,
            gateway,
            orders,
        }
    }

    /// Issue a gateway invoice for an order and persist its local mirror.
    ///
    /// On failure no local row exists, although a remote invoice may. Every
    /// exit after the gateway call is issued and before the row commits,
    /// including the future being dropped, is counted as an orphan.
    #[instrument(skip(self, payer_email, request), fields(order_id = %request.order_id))]
    pub async fn create_invoice(
        &self,
        user_id: Uuid,
        payer_email: &str,
        request: CreateInvoiceRequest,
    ) -> Result<CreateInvoiceResponse, AppError> {
        let amount = self.resolve_amount(&request.order_id, request.amount).await?;

        if let Some(existing) = self.store.find_active_by_order(&request.order_id).await? {
            warn!(
                invoice_id = %existing.id,
                gateway_id = %existing.gateway_id,
                "Active invoice already exists for order"
            );
            return Err(AppError::Conflict(
                messages::INVOICE_ALREADY_EXISTS,
                anyhow::anyhow!("Active invoice exists for order {}", request.order_id),
            ));
        }

        let gateway_request = CreateGatewayInvoice {
            external_id: request.order_id.clone(),
            amount,
            payer_email: payer_email.to_string(),
            description: request.description.clone(),
        };

        let mut orphan = OrphanGuard::arm(&request.order_id);

        let remote = match self.gateway.create_invoice(&gateway_request).await {
            Ok(remote) => remote,
            Err(e) => {
                orphan.disarm();
                error!(error = %e, "Gateway invoice creation failed");
                return Err(AppError::DependencyError(
                    messages::FAILED_TO_CREATE_INVOICE,
                    e,
                ));
            }
        };
        orphan.issued(&remote.id);

        let status = remote.status.parse::<InvoiceStatus>().map_err(|e| {
            error!(gateway_status = %remote.status, "Gateway returned an unrecognized status");
            AppError::DependencyError(messages::FAILED_TO_CREATE_INVOICE, e.into())
        })?;

        let new_invoice = NewInvoice {
            order_id: request.order_id.clone(),
            user_id,
            gateway_id: remote.id.clone(),
            amount,
            payment_method: remote.payment_method.clone(),
            payer_email: payer_email.to_string(),
            description: request.description,
            status,
            invoice_url: remote.invoice_url.clone(),
        };

        let invoice: Invoice = self.store.insert(&new_invoice).await?;
        orphan.disarm();

        INVOICES_CREATED_TOTAL
            .with_label_values(&[invoice.status.as_str()])
            .inc();
        info!(
            invoice_id = %invoice.id,
            gateway_id = %invoice.gateway_id,
            amount = %invoice.amount,
            "Invoice created"
        );

        Ok(CreateInvoiceResponse::from(&invoice))
    }

    /// The order service total wins over the caller's amount when configured.
    async fn resolve_amount(&self, order_id: &str, requested: Decimal) -> Result<Decimal, AppError> {
        let Some(orders) = &self.orders else {
            return Ok(requested);
        };

        match orders.total_amount(order_id).await {
            Ok(Some(total)) => {
                if total != requested {
                    warn!(
                        order_id,
                        requested = %requested,
                        total = %total,
                        "Requested amount differs from order total, using order total"
                    );
                }
                Ok(total)
            }
            Ok(None) => {
                warn!(order_id, "Order not found");
                Err(AppError::NotFound(
                    messages::ORDER_NOT_FOUND,
                    anyhow::anyhow!("Order {} not found", order_id),
                ))
            }
            Err(e) => {
                error!(order_id, error = %e, "Order lookup failed");
                Err(AppError::NotFound(messages::ORDER_NOT_FOUND, e))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        self.store.list_by_user(user_id).await
    }

    pub async fn invoice_exists(&self, user_id: Uuid, gateway_id: &str) -> Result<bool, AppError> {
        self.store.exists_for_user(user_id, gateway_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, user_id: Uuid, gateway_id: &str) -> Result<bool, AppError> {
        if !self.invoice_exists(user_id, gateway_id).await? {
            warn!("Delete requested for unknown invoice");
            return Err(AppError::NotFound(
                messages::INVOICE_NOT_FOUND,
                anyhow::anyhow!("Invoice {} not found", gateway_id),
            ));
        }

        let affected = self.store.soft_delete(user_id, gateway_id).await?;
        info!(affected, "Invoice soft-deleted");
        Ok(true)
    }
}

/// Counts a gateway invoice that may exist remotely without a local row.
///
/// Armed before the gateway call; fires on drop unless disarmed.
struct OrphanGuard {
    order_id: String,
    gateway_id: Option<String>,
    armed: bool,
}

impl OrphanGuard {
    fn arm(order_id: &str) -> Self {
        Self {
            order_id: order_id.to_string(),
            gateway_id: None,
            armed: true,
        }
    }

    fn issued(&mut self, gateway_id: &str) {
        self.gateway_id = Some(gateway_id.to_string());
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for OrphanGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        ORPHANED_GATEWAY_INVOICES_TOTAL.inc();
        error!(
            order_id = %self.order_id,
            gateway_id = self.gateway_id.as_deref().unwrap_or("unknown"),
            "Gateway invoice may exist without a committed local record"
        );
    }
}
