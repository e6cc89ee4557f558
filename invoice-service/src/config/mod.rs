//! Configuration module for invoice-service.

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct InvoiceServiceConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub xendit: XenditConfig,
    pub order_service: Option<OrderServiceConfig>,
    pub events: EventsConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Per-client Xendit settings, handed to `XenditClient::new` once at startup.
#[derive(Debug, Clone)]
pub struct XenditConfig {
    pub api_base_url: String,
    pub secret_key: Secret<String>,
    /// Shared token Xendit sends in `x-callback-token`.
    pub callback_token: Secret<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OrderServiceConfig {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EventsConfig {
    /// No URL means events are only logged.
    pub redis_url: Option<Secret<String>>,
    pub channel: String,
}

fn required(name: &str) -> Result<String, AppError> {
    env::var(name)
        .map_err(|_| AppError::ConfigError(anyhow::anyhow!("{} is required", name)))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn seconds(name: &str, default: u64) -> Duration {
    Duration::from_secs(
        env::var(name)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default),
    )
}

impl InvoiceServiceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "invoice-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: optional("OTLP_ENDPOINT"),
            database: DatabaseConfig {
                url: Secret::new(required("DATABASE_URL")?),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            xendit: XenditConfig {
                api_base_url: env::var("XENDIT_API_BASE_URL")
                    .unwrap_or_else(|_| "https://api.xendit.co".to_string()),
                secret_key: Secret::new(required("XENDIT_SECRET_KEY")?),
                callback_token: Secret::new(required("XENDIT_CALLBACK_TOKEN")?),
                timeout: seconds("XENDIT_TIMEOUT_SECS", 5),
            },
            order_service: optional("ORDER_SERVICE_URL").map(|url| OrderServiceConfig {
                url,
                timeout: seconds("ORDER_SERVICE_TIMEOUT_SECS", 5),
            }),
            events: EventsConfig {
                redis_url: optional("EVENTS_REDIS_URL").map(Secret::new),
                channel: env::var("EVENTS_CHANNEL")
                    .unwrap_or_else(|_| "payment.invoice.updated".to_string()),
            },
        })
    }
}
