//! Order service lookup used to resolve an order's payable amount.

use crate::config::OrderServiceConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderSummary {
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

#[async_trait]
pub trait OrderLookup: Send + Sync {
    /// `Ok(None)` when the order service does not know the order.
    async fn total_amount(&self, order_id: &str) -> Result<Option<Decimal>>;
}

#[derive(Clone)]
pub struct HttpOrderClient {
    client: Client,
    base_url: String,
}

impl HttpOrderClient {
    pub fn new(config: &OrderServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build order service HTTP client")?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl OrderLookup for HttpOrderClient {
    async fn total_amount(&self, order_id: &str) -> Result<Option<Decimal>> {
        let url = format!("{}/orders/{}", self.base_url, order_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Order service request failed: {}", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let order: OrderSummary = response
                    .json()
                    .await
                    .context("Unexpected order service response")?;
                tracing::debug!(order_id = %order.id, total_amount = %order.total_amount, "Order resolved");
                Ok(Some(order.total_amount))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(anyhow!("Order service returned {}: {}", status, body))
            }
        }
    }
}
