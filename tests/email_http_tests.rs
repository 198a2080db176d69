//! HTTP-level tests for the Resend email client against a stubbed server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use soroban_webhook_relayer::domain::error::AppError;
use soroban_webhook_relayer::domain::traits::EmailNotifier;
use soroban_webhook_relayer::infra::{ResendClient, ResendConfig};

fn client_for(server: &MockServer) -> ResendClient {
    let mut config = ResendConfig::new(
        "re_test_key".to_string(),
        "Relayer <notify@example.com>".to_string(),
    );
    config.base_url = server.uri();
    ResendClient::new(config)
}

#[tokio::test]
async fn payment_notification_posts_expected_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test_key"))
        .and(body_partial_json(json!({
            "from": "Relayer <notify@example.com>",
            "to": ["user@example.com"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_123"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .send_payment_received(
            "user@example.com",
            "Alice",
            "12.5",
            "USDC",
            "abc123",
            "GDLS6O...N43IALX",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn provider_rejection_surfaces_as_external_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "invalid from address"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .send_payment_received("user@example.com", "Alice", "5", "XLM", "h1", "sender")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ExternalService(_)));
    assert!(!err.is_retryable());
}
