//! End-to-end tests for the webhook endpoint and read APIs, exercising the
//! full router against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use soroban_webhook_relayer::api::create_router;
use soroban_webhook_relayer::app::AppState;
use soroban_webhook_relayer::domain::traits::{
    EmailNotifier, TransactionStore, UserStore, WalletStore,
};
use soroban_webhook_relayer::test_utils::{
    sample_hook, sample_wallet, MockEmailNotifier, MockTransactionStore, MockUserStore,
    MockWalletStore, RECIPIENT, SENDER,
};

struct TestApp {
    router: Router,
    store: Arc<MockTransactionStore>,
    email: Arc<MockEmailNotifier>,
}

fn test_app(wallets: MockWalletStore) -> TestApp {
    let store = Arc::new(MockTransactionStore::new());
    let email = Arc::new(MockEmailNotifier::new());
    let state = AppState::new(
        Arc::clone(&store) as Arc<dyn TransactionStore>,
        Arc::new(wallets) as Arc<dyn WalletStore>,
        Arc::new(MockUserStore::with_user(1, Some("user@example.com"))) as Arc<dyn UserStore>,
        Arc::clone(&email) as Arc<dyn EmailNotifier>,
        Duration::from_secs(60),
    );
    TestApp {
        router: create_router(state),
        store,
        email,
    }
}

fn recipient_wallet_app() -> TestApp {
    test_app(MockWalletStore::with_wallets(vec![sample_wallet(RECIPIENT, 1)]))
}

fn webhook_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/soroban-hooks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn new_transaction_then_duplicate_delivery() {
    let app = recipient_wallet_app();
    let payload = sample_hook("abc123", 10_000_000, true).raw.to_string();

    let response = app
        .router
        .clone()
        .oneshot(webhook_request(payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["isNewTransaction"], true);
    assert_eq!(body["paymentAmount"], "10000000");
    assert_eq!(body["recipientAccount"], RECIPIENT);
    assert_eq!(body["sourceAccount"], SENDER);
    assert_eq!(body["walletMappingsFound"], 1);
    assert_eq!(body["storageStatus"], "stored");

    assert_eq!(app.store.operation_count(), 1);
    assert_eq!(app.store.event_count(), 1);
    assert_eq!(app.store.signature_count(), 1);
    assert_eq!(app.email.sent_count(), 1);
    let sent = app.email.sent();
    assert_eq!(sent[0].to, "user@example.com");
    assert_eq!(sent[0].amount, "10000000");
    assert_eq!(sent[0].transaction_hash, "abc123");

    // Identical redelivery: acknowledged, nothing duplicated.
    let response = app
        .router
        .clone()
        .oneshot(webhook_request(payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["isNewTransaction"], false);
    assert_eq!(body["storageStatus"], "duplicate");

    assert_eq!(app.store.operation_count(), 1);
    assert_eq!(app.store.event_count(), 1);
    assert_eq!(app.email.sent_count(), 1);
}

#[tokio::test]
async fn non_json_content_type_rejected() {
    let app = recipient_wallet_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/soroban-hooks")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_body_acknowledged() {
    let app = recipient_wallet_app();
    let response = app
        .router
        .oneshot(webhook_request(Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["message"].as_str().unwrap().contains("acknowledged"));
    assert_eq!(app.email.sent_count(), 0);
}

#[tokio::test]
async fn malformed_json_rejected() {
    let app = recipient_wallet_app();
    let response = app
        .router
        .oneshot(webhook_request("{not valid json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INVALID_JSON");
}

#[tokio::test]
async fn missing_hash_acknowledged_without_processing() {
    let app = recipient_wallet_app();
    let payload = json!({
        "eventType": "get_contract_transaction",
        "data": { "id": "", "hash": "", "body": {} }
    })
    .to_string();
    let response = app.router.oneshot(webhook_request(payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.store.operation_count(), 0);
    assert_eq!(app.email.sent_count(), 0);
}

#[tokio::test]
async fn connection_error_invites_redelivery() {
    let app = recipient_wallet_app();
    app.store.fail_upserts_with_connection_error();
    let payload = sample_hook("retry1", 10_000_000, true).raw.to_string();
    let response = app.router.oneshot(webhook_request(payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unrecognized_envelope_acknowledged_with_error_note() {
    let app = recipient_wallet_app();
    // Neither tx nor tx_fee_bump present.
    let payload = json!({
        "eventType": "get_contract_transaction",
        "data": { "id": "x1", "hash": "h1", "body": {} }
    })
    .to_string();
    let response = app.router.oneshot(webhook_request(payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["message"].as_str().unwrap().contains("error"));
}

#[tokio::test]
async fn failed_transaction_stored_without_notification() {
    let app = recipient_wallet_app();
    let payload = sample_hook("failed1", 10_000_000, false).raw.to_string();
    let response = app.router.oneshot(webhook_request(payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.store.operation_count(), 1);
    assert_eq!(app.email.sent_count(), 0);
}

#[tokio::test]
async fn get_transaction_roundtrip() {
    let app = recipient_wallet_app();
    let payload = sample_hook("lookup1", 10_000_000, true).raw.to_string();
    app.router
        .clone()
        .oneshot(webhook_request(payload))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/transactions/lookup1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["transaction_hash"], "lookup1");
    assert_eq!(body["source_account"], SENDER);

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/transactions/unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn wallet_transactions_listed() {
    let wallet = sample_wallet(RECIPIENT, 1);
    let wallet_id = wallet.id;
    let app = test_app(MockWalletStore::with_wallets(vec![wallet]));

    let payload = sample_hook("bywallet1", 10_000_000, true).raw.to_string();
    app.router
        .clone()
        .oneshot(webhook_request(payload))
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri(format!("/api/wallets/{wallet_id}/transactions"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["transaction_hash"], "bywallet1");
}

#[tokio::test]
async fn webhook_secret_enforced_when_configured() {
    let store = Arc::new(MockTransactionStore::new());
    let email = Arc::new(MockEmailNotifier::new());
    let state = AppState::new(
        Arc::clone(&store) as Arc<dyn TransactionStore>,
        Arc::new(MockWalletStore::default()) as Arc<dyn WalletStore>,
        Arc::new(MockUserStore::default()) as Arc<dyn UserStore>,
        email as Arc<dyn EmailNotifier>,
        Duration::from_secs(60),
    )
    .with_webhook_secret(Some("s3cret".to_string()));
    let router = create_router(state);

    // No Authorization header at all.
    let payload = sample_hook("secret1", 10_000_000, true).raw.to_string();
    let response = router
        .clone()
        .oneshot(webhook_request(payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong secret.
    let request = Request::builder()
        .method("POST")
        .uri("/api/soroban-hooks")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "wrong")
        .body(Body::from(payload.clone()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/soroban-hooks")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "s3cret")
        .body(Body::from(payload))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_reflects_database_state() {
    let app = recipient_wallet_app();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    app.store.set_healthy(false);
    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn liveness_and_readiness_probes() {
    let app = recipient_wallet_app();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Readiness follows the database; liveness does not.
    app.store.set_healthy(false);
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .router
        .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
