//! Xendit invoice API client.
//!
//! Only invoice creation is needed: status changes arrive through the
//! callback endpoint rather than by polling.

use crate::config::XenditConfig;
use crate::services::metrics::GATEWAY_REQUEST_DURATION;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Request to create a hosted invoice.
#[derive(Debug, Clone, Serialize)]
pub struct CreateGatewayInvoice {
    /// Our order id; Xendit echoes it back as `external_id` in callbacks.
    pub external_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payer_email: String,
    pub description: String,
}

/// Invoice as returned by Xendit.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayInvoice {
    pub id: String,
    pub invoice_url: String,
    pub status: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub payer_email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Xendit API error response.
#[derive(Debug, Deserialize)]
pub struct XenditError {
    pub error_code: String,
    pub message: String,
}

/// Remote invoice issuer.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted invoice. Called once per attempt; never retried.
    async fn create_invoice(&self, request: &CreateGatewayInvoice) -> Result<GatewayInvoice>;
}

/// Xendit client with its credentials bound at construction.
#[derive(Clone)]
pub struct XenditClient {
    client: Client,
    config: XenditConfig,
}

impl XenditClient {
    pub fn new(config: XenditConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build Xendit HTTP client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PaymentGateway for XenditClient {
    async fn create_invoice(&self, request: &CreateGatewayInvoice) -> Result<GatewayInvoice> {
        let url = format!(
            "{}/v2/invoices",
            self.config.api_base_url.trim_end_matches('/')
        );

        let timer = GATEWAY_REQUEST_DURATION.start_timer();
        let response = self
            .client
            .post(&url)
            .basic_auth(self.config.secret_key.expose_secret(), Some(""))
            .json(request)
            .send()
            .await;
        timer.observe_duration();

        let response = response.map_err(|e| {
            if e.is_timeout() {
                anyhow!("Xendit request timed out: {}", e)
            } else {
                anyhow!("Xendit request failed: {}", e)
            }
        })?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Xendit create_invoice response");

        if status.is_success() {
            let invoice: GatewayInvoice =
                serde_json::from_str(&body).context("Unexpected Xendit invoice response")?;
            tracing::info!(
                gateway_id = %invoice.id,
                external_id = %request.external_id,
                status = %invoice.status,
                "Xendit invoice created"
            );
            Ok(invoice)
        } else {
            let error: XenditError =
                serde_json::from_str(&body).unwrap_or_else(|_| XenditError {
                    error_code: "UNKNOWN".to_string(),
                    message: body.clone(),
                });
            tracing::error!(
                http_status = %status,
                code = %error.error_code,
                message = %error.message,
                external_id = %request.external_id,
                "Xendit invoice creation failed"
            );
            Err(anyhow!("Xendit error: {} - {}", error.error_code, error.message))
        }
    }
}
