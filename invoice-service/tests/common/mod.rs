#![allow(dead_code)]

use invoice_service::services::memory::MemoryInvoiceStore;
use invoice_service::services::mock::{MockGateway, RecordingPublisher};
use invoice_service::services::{InvoiceEventPublisher, OrderLookup};
use invoice_service::startup::{AppState, Application};
use reqwest::{Client, Response};
use secrecy::Secret;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const CALLBACK_TOKEN: &str = "test-callback-token";
pub const PAYER_EMAIL: &str = "buyer@example.com";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<MemoryInvoiceStore>,
    pub gateway: Arc<MockGateway>,
    pub publisher: Arc<RecordingPublisher>,
    pub client: Client,
}

pub struct TestAppBuilder {
    gateway: MockGateway,
    publisher: RecordingPublisher,
    orders: Option<Arc<dyn OrderLookup>>,
}

impl TestAppBuilder {
    pub fn gateway(mut self, gateway: MockGateway) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn publisher(mut self, publisher: RecordingPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn orders(mut self, orders: Arc<dyn OrderLookup>) -> Self {
        self.orders = Some(orders);
        self
    }

    pub async fn spawn(self) -> TestApp {
        let store = Arc::new(MemoryInvoiceStore::new());
        let gateway = Arc::new(self.gateway);
        let publisher = Arc::new(self.publisher);
        let event_sink: Arc<dyn InvoiceEventPublisher> = publisher.clone();

        let state = AppState::new(
            store.clone(),
            gateway.clone(),
            self.orders,
            event_sink,
            Secret::new(CALLBACK_TOKEN.to_string()),
        );

        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let app = Application::bind(state, addr)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        // Wait for the server by polling the health endpoint
        for _ in 0..50 {
            if client
                .get(format!("{}/health", address))
                .send()
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            store,
            gateway,
            publisher,
            client,
        }
    }
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            gateway: MockGateway::new(),
            publisher: RecordingPublisher::new(),
            orders: None,
        }
    }

    pub async fn spawn() -> Self {
        Self::builder().spawn().await
    }

    pub async fn create_invoice(&self, user_id: Uuid, body: &Value) -> Response {
        self.client
            .post(format!("{}/payment/invoice", self.address))
            .header("X-User-ID", user_id.to_string())
            .header("X-User-Email", PAYER_EMAIL)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn list_invoices(&self, user_id: Uuid) -> Response {
        self.client
            .get(format!("{}/payment/invoice", self.address))
            .header("X-User-ID", user_id.to_string())
            .header("X-User-Email", PAYER_EMAIL)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete_invoice(&self, user_id: Uuid, gateway_id: &str) -> Response {
        self.client
            .delete(format!("{}/payment/invoice/{}", self.address, gateway_id))
            .header("X-User-ID", user_id.to_string())
            .header("X-User-Email", PAYER_EMAIL)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn callback(&self, token: Option<&str>, body: &Value) -> Response {
        let mut request = self
            .client
            .post(format!("{}/payment/xendit/callback", self.address))
            .json(body);
        if let Some(token) = token {
            request = request.header("x-callback-token", token);
        }
        request.send().await.expect("Failed to execute request")
    }
}

pub fn invoice_request(order_id: &str, amount: f64, description: &str) -> Value {
    serde_json::json!({
        "order_id": order_id,
        "amount": amount,
        "description": description
    })
}

pub fn callback_body(order_id: &str, gateway_id: &str, status: &str, amount: f64) -> Value {
    serde_json::json!({
        "id": gateway_id,
        "external_id": order_id,
        "amount": amount,
        "status": status,
        "payer_email": PAYER_EMAIL,
        "description": "test",
        "payment_method": "BANK_TRANSFER",
        "payment_channel": "BCA",
        "paid_amount": amount,
        "currency": "IDR"
    })
}
