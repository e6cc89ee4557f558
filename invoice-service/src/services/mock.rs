//! Mock collaborator implementations for testing.

use super::events::InvoiceEventPublisher;
use super::orders::OrderLookup;
use super::xendit::{CreateGatewayInvoice, GatewayInvoice, PaymentGateway};
use crate::models::Invoice;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Mock gateway issuing sequential invoice ids (`inv-1`, `inv-2`, ...).
pub struct MockGateway {
    calls: AtomicUsize,
    delay: Option<Duration>,
    status: String,
    fail: bool,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: None,
            status: "PENDING".to_string(),
            fail: false,
        }
    }

    /// Gateway that sleeps before answering, to widen race windows.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    /// Gateway answering with the given status string.
    pub fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_invoice(
        &self,
        request: &CreateGatewayInvoice,
    ) -> anyhow::Result<GatewayInvoice> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(anyhow::anyhow!("Mock gateway unavailable"));
        }

        let id = format!("inv-{}", n);
        Ok(GatewayInvoice {
            invoice_url: format!("https://checkout.xendit.co/web/{}", id),
            id,
            status: self.status.clone(),
            amount: request.amount,
            payer_email: Some(request.payer_email.clone()),
            description: Some(request.description.clone()),
            payment_method: None,
        })
    }
}

/// Order lookup answering from a fixed table.
#[derive(Default)]
pub struct StaticOrderLookup {
    orders: HashMap<String, Decimal>,
    fail: bool,
}

impl StaticOrderLookup {
    pub fn new<I, S>(orders: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        Self {
            orders: orders.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            orders: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl OrderLookup for StaticOrderLookup {
    async fn total_amount(&self, order_id: &str) -> anyhow::Result<Option<Decimal>> {
        if self.fail {
            return Err(anyhow::anyhow!("Mock order service unavailable"));
        }
        Ok(self.orders.get(order_id).copied())
    }
}

/// Publisher that keeps every published invoice.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Invoice>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn published(&self) -> Vec<Invoice> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl InvoiceEventPublisher for RecordingPublisher {
    async fn publish_invoice_updated(&self, invoice: &Invoice) -> Result<(), anyhow::Error> {
        if self.fail {
            return Err(anyhow::anyhow!("Mock event sink unavailable"));
        }
        if let Ok(mut published) = self.published.lock() {
            published.push(invoice.clone());
        }
        Ok(())
    }
}
