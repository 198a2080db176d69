//! Trait boundaries between the pipeline and its collaborators.
//!
//! The service depends on these rather than concrete clients so tests can
//! swap in mocks from `test_utils`.

use async_trait::async_trait;

use super::error::{AppError, DatabaseError};
use super::types::{
    EventRecord, NewTransaction, OperationRecord, SignatureRecord, StateChangeRecord,
    StoredTransaction, User, Wallet,
};

/// Persistence of transactions and their related records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn find_by_hash(&self, hash: &str) -> Result<Option<StoredTransaction>, DatabaseError>;

    /// Insert or update the row keyed by transaction hash.
    ///
    /// The returned flag is true when the row was newly inserted, false when
    /// an existing row was updated.
    async fn upsert_transaction(
        &self,
        tx: &NewTransaction,
    ) -> Result<(StoredTransaction, bool), DatabaseError>;

    async fn insert_operations(&self, records: &[OperationRecord]) -> Result<(), DatabaseError>;

    async fn insert_events(&self, records: &[EventRecord]) -> Result<(), DatabaseError>;

    async fn insert_state_changes(
        &self,
        records: &[StateChangeRecord],
    ) -> Result<(), DatabaseError>;

    async fn insert_signatures(&self, records: &[SignatureRecord]) -> Result<(), DatabaseError>;

    /// Recent transactions touching any of a wallet's addresses.
    async fn find_transactions_by_wallet(
        &self,
        wallet_id: uuid::Uuid,
        limit: i64,
    ) -> Result<Vec<StoredTransaction>, DatabaseError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// Lookup of registered wallets.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// All Stellar-compatible wallets whose address is in the given set.
    async fn find_by_addresses(&self, addresses: &[String]) -> Result<Vec<Wallet>, DatabaseError>;

    async fn find_by_address(&self, address: &str) -> Result<Option<Wallet>, DatabaseError>;

    /// Currency symbol recorded for a token contract, if any wallet balance
    /// references it.
    async fn find_currency_by_contract(
        &self,
        contract_address: &str,
    ) -> Result<Option<String>, DatabaseError>;
}

/// Lookup of notification recipients.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, DatabaseError>;
}

/// Outbound payment notifications.
#[async_trait]
pub trait EmailNotifier: Send + Sync {
    async fn send_payment_received(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        amount: &str,
        currency: &str,
        transaction_hash: &str,
        sender: &str,
    ) -> Result<(), AppError>;
}
