use crate::models::Invoice;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use std::time::Duration;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Sink for reconciled invoices.
#[async_trait]
pub trait InvoiceEventPublisher: Send + Sync {
    async fn publish_invoice_updated(&self, invoice: &Invoice) -> Result<(), anyhow::Error>;
}

/// Publishes the invoice JSON on a Redis channel.
#[derive(Clone)]
pub struct RedisInvoicePublisher {
    manager: ConnectionManager,
    channel: String,
}

impl RedisInvoicePublisher {
    pub async fn connect(url: &str, channel: &str) -> Result<Self, anyhow::Error> {
        tracing::info!(channel = %channel, "Connecting to Redis event sink");
        let client = Client::open(url)?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        Ok(Self {
            manager,
            channel: channel.to_string(),
        })
    }
}

#[async_trait]
impl InvoiceEventPublisher for RedisInvoicePublisher {
    async fn publish_invoice_updated(&self, invoice: &Invoice) -> Result<(), anyhow::Error> {
        let payload = serde_json::to_string(invoice)?;
        let mut conn = self.manager.clone();

        let receivers: i64 = tokio::time::timeout(
            PUBLISH_TIMEOUT,
            redis::cmd("PUBLISH")
                .arg(&self.channel)
                .arg(payload)
                .query_async(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Timed out publishing to {}", self.channel))?
        .map_err(|e| anyhow::anyhow!("Failed to publish invoice event: {}", e))?;

        tracing::debug!(
            invoice_id = %invoice.id,
            channel = %self.channel,
            receivers,
            "Invoice event published"
        );
        Ok(())
    }
}

/// Used when no event sink is configured.
pub struct LogOnlyPublisher;

#[async_trait]
impl InvoiceEventPublisher for LogOnlyPublisher {
    async fn publish_invoice_updated(&self, invoice: &Invoice) -> Result<(), anyhow::Error> {
        tracing::info!(
            invoice_id = %invoice.id,
            order_id = %invoice.order_id,
            status = %invoice.status,
            "Invoice updated (no event sink configured)"
        );
        Ok(())
    }
}
