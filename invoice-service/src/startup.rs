//! Application startup and lifecycle management.

use crate::config::InvoiceServiceConfig;
use crate::handlers;
use crate::services::{
    CallbackReconciler, HttpOrderClient, InvoiceEventPublisher, InvoiceLifecycle, InvoiceStore,
    LogOnlyPublisher, OrderLookup, PaymentGateway, PgInvoiceStore, RedisInvoicePublisher,
    XenditClient,
};
use axum::{
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::{make_request_span, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InvoiceStore>,
    pub lifecycle: InvoiceLifecycle,
    pub reconciler: CallbackReconciler,
}

impl AppState {
    pub fn new(
        store: Arc<dyn InvoiceStore>,
        gateway: Arc<dyn PaymentGateway>,
        orders: Option<Arc<dyn OrderLookup>>,
        publisher: Arc<dyn InvoiceEventPublisher>,
        callback_token: secrecy::Secret<String>,
    ) -> Self {
        Self {
            lifecycle: InvoiceLifecycle::new(store.clone(), gateway, orders),
            reconciler: CallbackReconciler::new(callback_token, store.clone(), publisher),
            store,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/payment/invoice",
            post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
        )
        .route(
            "/payment/invoice/:id",
            delete(handlers::invoices::delete_invoice),
        )
        .route(
            "/payment/xendit/callback",
            post(handlers::callback::xendit_callback),
        )
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to every collaborator, run migrations and bind the listener.
    pub async fn build(config: InvoiceServiceConfig) -> Result<Self, AppError> {
        let store = PgInvoiceStore::connect(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;
        store.run_migrations().await?;

        let gateway = XenditClient::new(config.xendit.clone()).map_err(AppError::ConfigError)?;

        let orders: Option<Arc<dyn OrderLookup>> = match &config.order_service {
            Some(order_config) => {
                tracing::info!(url = %order_config.url, "Order service lookup enabled");
                let client: Arc<dyn OrderLookup> =
                    Arc::new(HttpOrderClient::new(order_config).map_err(AppError::ConfigError)?);
                Some(client)
            }
            None => {
                tracing::warn!("ORDER_SERVICE_URL not set, trusting caller-supplied amounts");
                None
            }
        };

        let publisher: Arc<dyn InvoiceEventPublisher> = match &config.events.redis_url {
            Some(url) => Arc::new(
                RedisInvoicePublisher::connect(url.expose_secret(), &config.events.channel)
                    .await
                    .map_err(AppError::InternalError)?,
            ),
            None => {
                tracing::warn!("EVENTS_REDIS_URL not set, invoice events are only logged");
                Arc::new(LogOnlyPublisher)
            }
        };

        let state = AppState::new(
            Arc::new(store),
            Arc::new(gateway),
            orders,
            publisher,
            config.xendit.callback_token.clone(),
        );

        let addr: SocketAddr = format!("{}:{}", config.common.host, config.common.port)
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid listen address: {}", e)))?;

        Self::bind(state, addr).await
    }

    /// Bind a listener for an already wired state. Port 0 picks a free port.
    pub async fn bind(state: AppState, addr: SocketAddr) -> Result<Self, AppError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "invoice-service listening");

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
