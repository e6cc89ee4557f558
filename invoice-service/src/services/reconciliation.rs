//! Applies Xendit invoice callbacks to the local mirror.

use crate::dtos::XenditCallbackPayload;
use crate::messages;
use crate::models::{Invoice, InvoiceReconciliation, InvoiceStatus};
use crate::services::events::InvoiceEventPublisher;
use crate::services::metrics::{record_callback, EVENT_PUBLISH_FAILURES_TOTAL};
use crate::services::store::InvoiceStore;
use secrecy::{ExposeSecret, Secret};
use service_core::error::AppError;
use service_core::utils::tokens_match;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

#[derive(Clone)]
pub struct CallbackReconciler {
    callback_token: Secret<String>,
    store: Arc<dyn InvoiceStore>,
    publisher: Arc<dyn InvoiceEventPublisher>,
}

impl CallbackReconciler {
    pub fn new(
        callback_token: Secret<String>,
        store: Arc<dyn InvoiceStore>,
        publisher: Arc<dyn InvoiceEventPublisher>,
    ) -> Self {
        Self {
            callback_token,
            store,
            publisher,
        }
    }

    /// Authenticate, parse and apply one callback delivery.
    ///
    /// The body is only parsed after the token matches. A delivery for an
    /// invoice that already left `PENDING`, or for a gateway invoice the
    /// order has since replaced, matches nothing and yields `NotFound`
    /// without touching any row.
    #[instrument(skip_all, fields(order_id = tracing::field::Empty))]
    pub async fn handle_callback(
        &self,
        token: Option<&str>,
        body: &[u8],
    ) -> Result<Invoice, AppError> {
        let authorized = token
            .map(|t| tokens_match(self.callback_token.expose_secret(), t))
            .unwrap_or(false);
        if !authorized {
            record_callback("unauthorized");
            warn!(token_present = token.is_some(), "Rejected callback with invalid token");
            return Err(AppError::Unauthorized(
                messages::UNAUTHORIZED_ACCESS,
                anyhow::anyhow!("Invalid callback token"),
            ));
        }

        let payload: XenditCallbackPayload = serde_json::from_slice(body).map_err(|e| {
            record_callback("rejected");
            warn!(error = %e, "Malformed callback body");
            AppError::BadRequest(messages::INVALID_REQUEST_DATA, e.into())
        })?;
        payload.validate().inspect_err(|_| record_callback("rejected"))?;

        let span = tracing::Span::current();
        span.record("order_id", payload.external_id.as_str());

        let status = match payload.status.parse::<InvoiceStatus>() {
            Ok(status) if InvoiceStatus::Pending.can_transition_to(status) => status,
            _ => {
                record_callback("rejected");
                warn!(
                    order_id = %payload.external_id,
                    gateway_id = %payload.id,
                    gateway_status = %payload.status,
                    "Callback requests a status change that is not allowed"
                );
                return Err(AppError::Conflict(
                    messages::INVALID_STATUS_TRANSITION,
                    anyhow::anyhow!("PENDING -> {} is not allowed", payload.status),
                ));
            }
        };

        let update = InvoiceReconciliation {
            gateway_id: payload.id.clone(),
            status,
            description: payload.description.clone(),
            payment_method: payload.payment_method.clone(),
            payment_channel: payload.payment_channel.clone(),
            payer_email: payload.payer_email.clone(),
        };

        let reconciled = match self
            .store
            .reconcile_pending(&payload.external_id, &update)
            .await
        {
            Ok(Some(reconciled)) => reconciled,
            Ok(None) => {
                record_callback("not_found");
                match self.store.find_active_by_order(&payload.external_id).await {
                    Ok(Some(active)) => warn!(
                        order_id = %payload.external_id,
                        active_gateway_id = %active.gateway_id,
                        callback_gateway_id = %payload.id,
                        "Callback for a superseded gateway invoice"
                    ),
                    _ => warn!(
                        order_id = %payload.external_id,
                        gateway_id = %payload.id,
                        "No pending invoice for callback"
                    ),
                }
                return Err(AppError::NotFound(
                    messages::INVOICE_NOT_FOUND,
                    anyhow::anyhow!("No pending invoice for order {}", payload.external_id),
                ));
            }
            Err(e) => {
                record_callback("error");
                return Err(e);
            }
        };

        if reconciled.before.amount != payload.amount {
            warn!(
                order_id = %payload.external_id,
                stored_amount = %reconciled.before.amount,
                callback_amount = %payload.amount,
                "Callback amount differs from stored invoice, keeping stored amount"
            );
        }

        let invoice = reconciled.after;
        record_callback("applied");
        info!(
            invoice_id = %invoice.id,
            order_id = %invoice.order_id,
            from = %reconciled.before.status,
            to = %invoice.status,
            "Invoice reconciled"
        );

        if let Err(e) = self.publisher.publish_invoice_updated(&invoice).await {
            EVENT_PUBLISH_FAILURES_TOTAL.inc();
            error!(invoice_id = %invoice.id, error = %e, "Failed to publish invoice event");
        }

        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewInvoice;
    use crate::services::memory::MemoryInvoiceStore;
    use crate::services::mock::RecordingPublisher;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    const TOKEN: &str = "callback-token";

    async fn seeded_store() -> Arc<MemoryInvoiceStore> {
        let store = Arc::new(MemoryInvoiceStore::new());
        store
            .insert(&NewInvoice {
                order_id: "O-1".to_string(),
                user_id: Uuid::new_v4(),
                gateway_id: "inv-1".to_string(),
                amount: Decimal::new(50_000, 0),
                payment_method: None,
                payer_email: "buyer@example.com".to_string(),
                description: "test".to_string(),
                status: InvoiceStatus::Pending,
                invoice_url: "https://checkout.xendit.co/web/inv-1".to_string(),
            })
            .await
            .unwrap();
        store
    }

    fn body(status: &str, gateway_id: &str, amount: i64) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": gateway_id,
            "external_id": "O-1",
            "amount": amount,
            "status": status,
            "payer_email": "buyer@example.com",
            "description": "test",
            "payment_method": "BANK_TRANSFER",
            "payment_channel": "BCA"
        }))
        .unwrap()
    }

    fn reconciler(
        store: Arc<MemoryInvoiceStore>,
        publisher: Arc<RecordingPublisher>,
    ) -> CallbackReconciler {
        CallbackReconciler::new(Secret::new(TOKEN.to_string()), store, publisher)
    }

    #[tokio::test]
    async fn applies_paid_callback_and_publishes() {
        let store = seeded_store().await;
        let publisher = Arc::new(RecordingPublisher::new());
        let reconciler = reconciler(store.clone(), publisher.clone());

        let invoice = reconciler
            .handle_callback(Some(TOKEN), &body("PAID", "inv-1", 50_000))
            .await
            .unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.payment_method.as_deref(), Some("BANK_TRANSFER"));
        assert_eq!(publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn wrong_token_never_touches_the_row() {
        let store = seeded_store().await;
        let before = store.all().await;
        let reconciler = reconciler(store.clone(), Arc::new(RecordingPublisher::new()));

        let err = reconciler
            .handle_callback(Some("guess"), &body("PAID", "inv-1", 50_000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(..)));

        let err = reconciler
            .handle_callback(None, b"not json at all")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(..)));

        assert_eq!(store.all().await, before);
    }

    #[tokio::test]
    async fn pending_callback_is_an_invalid_transition() {
        let store = seeded_store().await;
        let before = store.all().await;
        let reconciler = reconciler(store.clone(), Arc::new(RecordingPublisher::new()));

        let err = reconciler
            .handle_callback(Some(TOKEN), &body("PENDING", "inv-1", 50_000))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(msg, _) if msg == messages::INVALID_STATUS_TRANSITION));
        assert_eq!(store.all().await, before);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let reconciler = reconciler(seeded_store().await, Arc::new(RecordingPublisher::new()));

        let err = reconciler
            .handle_callback(Some(TOKEN), br#"{"id":"inv-1"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(..)));
    }

    #[tokio::test]
    async fn mismatched_amount_keeps_stored_amount() {
        let store = seeded_store().await;
        let reconciler = reconciler(store, Arc::new(RecordingPublisher::new()));

        let invoice = reconciler
            .handle_callback(Some(TOKEN), &body("EXPIRED", "inv-1", 10))
            .await
            .unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Expired);
        assert_eq!(invoice.amount, Decimal::new(50_000, 0));
        assert_eq!(invoice.gateway_id, "inv-1");
    }

    #[tokio::test]
    async fn unknown_gateway_id_is_not_found() {
        let store = seeded_store().await;
        let before = store.all().await;
        let reconciler = reconciler(store.clone(), Arc::new(RecordingPublisher::new()));

        let err = reconciler
            .handle_callback(Some(TOKEN), &body("PAID", "inv-9", 50_000))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(msg, _) if msg == messages::INVOICE_NOT_FOUND));
        assert_eq!(store.all().await, before);
    }

    #[tokio::test]
    async fn late_callback_for_replaced_invoice_leaves_new_one_pending() {
        let store = seeded_store().await;
        let publisher = Arc::new(RecordingPublisher::new());
        let reconciler = reconciler(store.clone(), publisher.clone());

        reconciler
            .handle_callback(Some(TOKEN), &body("EXPIRED", "inv-1", 50_000))
            .await
            .unwrap();
        let replacement = store
            .insert(&NewInvoice {
                order_id: "O-1".to_string(),
                user_id: Uuid::new_v4(),
                gateway_id: "inv-2".to_string(),
                amount: Decimal::new(50_000, 0),
                payment_method: None,
                payer_email: "buyer@example.com".to_string(),
                description: "test".to_string(),
                status: InvoiceStatus::Pending,
                invoice_url: "https://checkout.xendit.co/web/inv-2".to_string(),
            })
            .await
            .unwrap();

        let err = reconciler
            .handle_callback(Some(TOKEN), &body("EXPIRED", "inv-1", 50_000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
        assert_eq!(store.find_by_id(replacement.id).await.unwrap().unwrap(), replacement);

        let paid = reconciler
            .handle_callback(Some(TOKEN), &body("PAID", "inv-2", 50_000))
            .await
            .unwrap();
        assert_eq!(paid.id, replacement.id);
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.gateway_id, "inv-2");
        assert_eq!(publisher.published().len(), 2);
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_callback() {
        let store = seeded_store().await;
        let reconciler = reconciler(store, Arc::new(RecordingPublisher::failing()));

        let invoice = reconciler
            .handle_callback(Some(TOKEN), &body("SETTLED", "inv-1", 50_000))
            .await
            .unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }
}
