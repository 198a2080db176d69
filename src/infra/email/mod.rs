//! Payment notification delivery via the Resend HTTP API.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::domain::error::{AppError, ExternalServiceError};
use crate::domain::traits::EmailNotifier;

const DEFAULT_BASE_URL: &str = "https://api.resend.com";

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: String,
    pub from_address: String,
    pub base_url: String,
}

impl ResendConfig {
    #[must_use]
    pub fn new(api_key: String, from_address: String) -> Self {
        Self {
            api_key,
            from_address,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

pub struct ResendClient {
    client: reqwest::Client,
    config: ResendConfig,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

impl ResendClient {
    #[must_use]
    pub fn new(config: ResendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn send(&self, request: &SendEmailRequest<'_>) -> Result<(), AppError> {
        let url = format!("{}/emails", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExternalServiceError::Timeout(e.to_string())
                } else if e.is_connect() {
                    ExternalServiceError::Unavailable(e.to_string())
                } else {
                    ExternalServiceError::Rejected(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExternalServiceError::Rejected(format!("{status}: {body}")).into());
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExternalServiceError::Rejected(e.to_string()))?;
        info!(email_id = body.get("id").and_then(serde_json::Value::as_str), "email accepted by provider");
        Ok(())
    }
}

#[async_trait]
impl EmailNotifier for ResendClient {
    #[instrument(skip_all, fields(tx_hash = %transaction_hash))]
    async fn send_payment_received(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        amount: &str,
        currency: &str,
        transaction_hash: &str,
        sender: &str,
    ) -> Result<(), AppError> {
        let request = SendEmailRequest {
            from: &self.config.from_address,
            to: [recipient_email],
            subject: format!("Payment received: {amount} {currency}"),
            html: payment_received_html(recipient_name, amount, currency, transaction_hash, sender),
        };
        self.send(&request).await
    }
}

fn payment_received_html(
    name: &str,
    amount: &str,
    currency: &str,
    transaction_hash: &str,
    sender: &str,
) -> String {
    format!(
        r#"<div style="font-family: sans-serif; max-width: 600px;">
  <h2>Payment received</h2>
  <p>Hi {name},</p>
  <p>You received <strong>{amount} {currency}</strong> from {sender}.</p>
  <p style="color: #666; font-size: 12px;">Transaction: {transaction_hash}</p>
</div>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_html_includes_all_fields() {
        let html = payment_received_html("Alice", "12.5", "USDC", "abc123", "GSEND...ER");
        assert!(html.contains("Alice"));
        assert!(html.contains("12.5 USDC"));
        assert!(html.contains("abc123"));
        assert!(html.contains("GSEND...ER"));
    }
}
