mod common;

use common::{invoice_request, TestApp, PAYER_EMAIL};
use invoice_service::models::InvoiceStatus;
use invoice_service::services::mock::{MockGateway, StaticOrderLookup};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::Value;
use service_core::response::ApiEnvelope;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[tokio::test]
async fn create_invoice_returns_persisted_fields() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();

    let response = app
        .create_invoice(user, &invoice_request("O-1", 50000.0, "test"))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: ApiEnvelope<Value> = response.json().await.unwrap();
    assert_eq!(body.status_code, 201);
    assert_eq!(body.message.key, "INVOICE_CREATED");

    let data = body.data.unwrap();
    assert_eq!(data["order_id"], "O-1");
    assert_eq!(data["gateway_id"], "inv-1");
    assert_eq!(data["status"], "PENDING");
    assert_eq!(data["amount"], 50000.0);

    let rows = app.store.all().await;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(data["id"], row.id.to_string());
    assert_eq!(data["invoice_url"], row.invoice_url);
    assert_eq!(row.user_id, user);
    assert_eq!(row.payer_email, PAYER_EMAIL);
    assert_eq!(row.amount, Decimal::new(50_000, 0));
    assert_eq!(row.status, InvoiceStatus::Pending);
}

#[tokio::test]
async fn duplicate_create_is_a_conflict_without_gateway_call() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();

    let first = app.create_invoice(user, &invoice_request("O-1", 50000.0, "test")).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.create_invoice(user, &invoice_request("O-1", 50000.0, "test")).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body: ApiEnvelope<Value> = second.json().await.unwrap();
    assert_eq!(body.message.key, "INVOICE_ALREADY_EXISTS");

    assert_eq!(app.gateway.calls(), 1);
    assert_eq!(app.store.all().await.len(), 1);
}

#[tokio::test]
async fn concurrent_creates_yield_one_invoice() {
    let app = TestApp::builder()
        .gateway(MockGateway::with_delay(Duration::from_millis(200)))
        .spawn()
        .await;
    let user = Uuid::new_v4();
    let body = invoice_request("O-7", 50000.0, "test");

    let (a, b) = tokio::join!(app.create_invoice(user, &body), app.create_invoice(user, &body));

    let mut statuses = vec![a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
    assert_eq!(app.store.all().await.len(), 1);
}

#[tokio::test]
async fn gateway_failure_is_internal_error_without_row() {
    let app = TestApp::builder()
        .gateway(MockGateway::failing())
        .spawn()
        .await;

    let response = app
        .create_invoice(Uuid::new_v4(), &invoice_request("O-1", 50000.0, "test"))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ApiEnvelope<Value> = response.json().await.unwrap();
    assert_eq!(body.message.key, "FAILED_TO_CREATE_INVOICE");
    assert!(body.errors.is_none());
    assert!(app.store.all().await.is_empty());
}

#[tokio::test]
async fn invalid_body_is_bad_request() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();

    let zero = app.create_invoice(user, &invoice_request("O-1", 0.0, "test")).await;
    assert_eq!(zero.status(), StatusCode::BAD_REQUEST);
    let body: ApiEnvelope<Value> = zero.json().await.unwrap();
    assert_eq!(body.message.key, "INVALID_REQUEST_DATA");
    assert!(body.errors.is_some());

    let missing = app
        .create_invoice(user, &serde_json::json!({ "order_id": "O-1" }))
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/payment/invoice", app.address))
        .json(&invoice_request("O-1", 50000.0, "test"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ApiEnvelope<Value> = response.json().await.unwrap();
    assert_eq!(body.message.key, "UNAUTHORIZED_ACCESS");
}

#[tokio::test]
async fn order_service_amount_is_authoritative() {
    let app = TestApp::builder()
        .orders(Arc::new(StaticOrderLookup::new([(
            "O-1",
            Decimal::new(65_000, 0),
        )])))
        .spawn()
        .await;

    let created = app
        .create_invoice(Uuid::new_v4(), &invoice_request("O-1", 50000.0, "test"))
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body: ApiEnvelope<Value> = created.json().await.unwrap();
    assert_eq!(body.data.unwrap()["amount"], 65000.0);

    let unknown = app
        .create_invoice(Uuid::new_v4(), &invoice_request("O-2", 50000.0, "test"))
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    let body: ApiEnvelope<Value> = unknown.json().await.unwrap();
    assert_eq!(body.message.key, "ORDER_NOT_FOUND");
}

#[tokio::test]
async fn empty_list_is_ok() {
    let app = TestApp::spawn().await;

    let response = app.list_invoices(Uuid::new_v4()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: ApiEnvelope<Vec<Value>> = response.json().await.unwrap();
    assert_eq!(body.data, Some(vec![]));
}

#[tokio::test]
async fn list_is_scoped_to_user_and_newest_first() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();

    app.create_invoice(user, &invoice_request("O-1", 10000.0, "first")).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    app.create_invoice(user, &invoice_request("O-2", 20000.0, "second")).await;
    app.create_invoice(Uuid::new_v4(), &invoice_request("O-3", 30000.0, "other")).await;

    let response = app.list_invoices(user).await;
    let body: ApiEnvelope<Vec<Value>> = response.json().await.unwrap();
    let data = body.data.unwrap();

    let orders: Vec<&str> = data.iter().map(|i| i["order_id"].as_str().unwrap()).collect();
    assert_eq!(orders, vec!["O-2", "O-1"]);
    assert_eq!(data[0]["payer_email"], PAYER_EMAIL);
    assert!(data[0]["payment_channel"].is_null());
}

#[tokio::test]
async fn delete_twice_is_not_found_and_row_is_kept() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();

    app.create_invoice(user, &invoice_request("O-1", 50000.0, "test")).await;

    let first = app.delete_invoice(user, "inv-1").await;
    assert_eq!(first.status(), StatusCode::OK);
    let body: ApiEnvelope<bool> = first.json().await.unwrap();
    assert_eq!(body.data, Some(true));
    assert_eq!(body.message.key, "INVOICE_DELETED");

    let second = app.delete_invoice(user, "inv-1").await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    let body: ApiEnvelope<Value> = second.json().await.unwrap();
    assert_eq!(body.message.key, "INVOICE_NOT_FOUND");

    let rows = app.store.all().await;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].deleted_at.is_some());

    let listed: ApiEnvelope<Vec<Value>> = app.list_invoices(user).await.json().await.unwrap();
    assert_eq!(listed.data, Some(vec![]));
}

#[tokio::test]
async fn delete_of_another_users_invoice_is_not_found() {
    let app = TestApp::spawn().await;
    let owner = Uuid::new_v4();
    app.create_invoice(owner, &invoice_request("O-1", 50000.0, "test")).await;

    let response = app.delete_invoice(Uuid::new_v4(), "inv-1").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.store.all().await[0].deleted_at.is_none());
}
