//! Shared application state handed to the HTTP layer.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::traits::{EmailNotifier, TransactionStore, UserStore, WalletStore};

use super::service::WebhookService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WebhookService>,
    /// When set, inbound webhooks must carry this value in the
    /// `Authorization` header.
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        wallets: Arc<dyn WalletStore>,
        users: Arc<dyn UserStore>,
        email: Arc<dyn EmailNotifier>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            service: Arc::new(WebhookService::new(
                transactions,
                wallets,
                users,
                email,
                cache_ttl,
            )),
            webhook_secret: None,
        }
    }

    #[must_use]
    pub fn with_webhook_secret(mut self, secret: Option<String>) -> Self {
        self.webhook_secret = secret.map(Into::into);
        self
    }
}
