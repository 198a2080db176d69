//! In-memory mock implementations of the collaborator traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::error::{AppError, DatabaseError};
use crate::domain::traits::{EmailNotifier, TransactionStore, UserStore, WalletStore};
use crate::domain::types::{
    EventRecord, NewTransaction, OperationRecord, SignatureRecord, StateChangeRecord,
    StoredTransaction, User, Wallet,
};

use super::samples::sample_stored_transaction;

#[derive(Default)]
pub struct MockTransactionStore {
    transactions: Mutex<HashMap<String, StoredTransaction>>,
    operations: Mutex<Vec<OperationRecord>>,
    events: Mutex<Vec<EventRecord>>,
    state_changes: Mutex<Vec<StateChangeRecord>>,
    signatures: Mutex<Vec<SignatureRecord>>,
    duplicate_race: Mutex<Option<String>>,
    fail_upserts_with_connection: AtomicBool,
    healthy: AtomicBool,
}

impl MockTransactionStore {
    #[must_use]
    pub fn new() -> Self {
        let store = Self::default();
        store.healthy.store(true, Ordering::SeqCst);
        store
    }

    /// The next upsert for this hash fails with a uniqueness violation, as
    /// if a concurrent delivery committed first. The winning record becomes
    /// visible to subsequent lookups.
    pub fn fail_next_upsert_with_duplicate(&self, hash: &str) {
        *self.duplicate_race.lock().unwrap() = Some(hash.to_string());
    }

    pub fn fail_upserts_with_connection_error(&self) {
        self.fail_upserts_with_connection.store(true, Ordering::SeqCst);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.lock().unwrap().len()
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    #[must_use]
    pub fn state_change_count(&self) -> usize {
        self.state_changes.lock().unwrap().len()
    }

    #[must_use]
    pub fn signature_count(&self) -> usize {
        self.signatures.lock().unwrap().len()
    }
}

#[async_trait]
impl TransactionStore for MockTransactionStore {
    async fn find_by_hash(&self, hash: &str) -> Result<Option<StoredTransaction>, DatabaseError> {
        Ok(self.transactions.lock().unwrap().get(hash).cloned())
    }

    async fn upsert_transaction(
        &self,
        tx: &NewTransaction,
    ) -> Result<(StoredTransaction, bool), DatabaseError> {
        if self.fail_upserts_with_connection.load(Ordering::SeqCst) {
            return Err(DatabaseError::Connection("connection reset by peer".to_string()));
        }

        let mut race = self.duplicate_race.lock().unwrap();
        if race.as_deref() == Some(tx.transaction_hash.as_str()) {
            let hash = race.take().unwrap();
            let winner = sample_stored_transaction(&hash);
            self.transactions.lock().unwrap().insert(hash.clone(), winner);
            return Err(DatabaseError::Duplicate(format!(
                "duplicate key value violates unique constraint: {hash}"
            )));
        }
        drop(race);

        let mut transactions = self.transactions.lock().unwrap();
        if let Some(existing) = transactions.get_mut(&tx.transaction_hash) {
            existing.updated_at = Utc::now();
            existing.source_wallet_id = existing.source_wallet_id.or(tx.source_wallet_id);
            existing.user_id = existing.user_id.or(tx.user_id);
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let stored = StoredTransaction {
            id: Uuid::new_v4(),
            transaction_id: tx.transaction_id.clone(),
            transaction_hash: tx.transaction_hash.clone(),
            ledger: tx.ledger,
            timestamp: tx.timestamp,
            protocol: tx.protocol,
            chain: tx.chain.clone(),
            paging_token: tx.paging_token.clone(),
            message: tx.message.clone(),
            source_account: tx.source_account.clone(),
            fee: tx.fee,
            seq_num: tx.seq_num,
            memo: tx.memo.clone(),
            fee_charged: tx.fee_charged,
            return_value: tx.return_value.clone(),
            is_successful: tx.is_successful,
            error_details: tx.error_details.clone(),
            raw_webhook_data: tx.raw_webhook_data.clone(),
            source_wallet_id: tx.source_wallet_id,
            user_id: tx.user_id,
            created_at: now,
            updated_at: now,
        };
        transactions.insert(tx.transaction_hash.clone(), stored.clone());
        Ok((stored, true))
    }

    async fn insert_operations(&self, records: &[OperationRecord]) -> Result<(), DatabaseError> {
        self.operations.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn insert_events(&self, records: &[EventRecord]) -> Result<(), DatabaseError> {
        self.events.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn insert_state_changes(
        &self,
        records: &[StateChangeRecord],
    ) -> Result<(), DatabaseError> {
        self.state_changes.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn insert_signatures(&self, records: &[SignatureRecord]) -> Result<(), DatabaseError> {
        self.signatures.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn find_transactions_by_wallet(
        &self,
        wallet_id: Uuid,
        limit: i64,
    ) -> Result<Vec<StoredTransaction>, DatabaseError> {
        let mut matches: Vec<StoredTransaction> = self
            .transactions
            .lock()
            .unwrap()
            .values()
            .filter(|tx| tx.source_wallet_id == Some(wallet_id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matches.truncate(limit as usize);
        Ok(matches)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::Database(DatabaseError::Connection(
                "mock database down".to_string(),
            )))
        }
    }
}

#[derive(Default)]
pub struct MockWalletStore {
    wallets: Vec<Wallet>,
    currencies: HashMap<String, String>,
}

impl MockWalletStore {
    #[must_use]
    pub fn with_wallets(wallets: Vec<Wallet>) -> Self {
        Self {
            wallets,
            currencies: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_currency(mut self, contract: &str, currency: &str) -> Self {
        self.currencies.insert(contract.to_string(), currency.to_string());
        self
    }
}

#[async_trait]
impl WalletStore for MockWalletStore {
    async fn find_by_addresses(&self, addresses: &[String]) -> Result<Vec<Wallet>, DatabaseError> {
        Ok(self
            .wallets
            .iter()
            .filter(|w| {
                let compatible = w.network.as_deref().is_none_or(|n| {
                    matches!(n.to_lowercase().as_str(), "stellar" | "xlm" | "soroban")
                });
                compatible && addresses.contains(&w.address)
            })
            .cloned()
            .collect())
    }

    async fn find_by_address(&self, address: &str) -> Result<Option<Wallet>, DatabaseError> {
        Ok(self.wallets.iter().find(|w| w.address == address).cloned())
    }

    async fn find_currency_by_contract(
        &self,
        contract_address: &str,
    ) -> Result<Option<String>, DatabaseError> {
        Ok(self.currencies.get(contract_address).cloned())
    }
}

#[derive(Default)]
pub struct MockUserStore {
    users: HashMap<i64, User>,
}

impl MockUserStore {
    #[must_use]
    pub fn with_user(id: i64, email: Option<&str>) -> Self {
        let mut users = HashMap::new();
        users.insert(
            id,
            User {
                id,
                email: email.map(str::to_string),
                name: Some("Test User".to_string()),
            },
        );
        Self { users }
    }
}

#[async_trait]
impl UserStore for MockUserStore {
    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.get(&user_id).cloned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub to: String,
    pub recipient_name: String,
    pub amount: String,
    pub currency: String,
    pub transaction_hash: String,
    pub sender: String,
}

#[derive(Default)]
pub struct MockEmailNotifier {
    sent: Mutex<Vec<SentEmail>>,
    fail: AtomicBool,
}

impl MockEmailNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_all_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailNotifier for MockEmailNotifier {
    async fn send_payment_received(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        amount: &str,
        currency: &str,
        transaction_hash: &str,
        sender: &str,
    ) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ExternalService(
                crate::domain::error::ExternalServiceError::Rejected(
                    "mock send failure".to_string(),
                ),
            ));
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: recipient_email.to_string(),
            recipient_name: recipient_name.to_string(),
            amount: amount.to_string(),
            currency: currency.to_string(),
            transaction_hash: transaction_hash.to_string(),
            sender: sender.to_string(),
        });
        Ok(())
    }
}
