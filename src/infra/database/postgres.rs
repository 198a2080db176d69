//! Postgres-backed persistence for transactions, wallets, and users.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::error::{AppError, DatabaseError};
use crate::domain::traits::{TransactionStore, UserStore, WalletStore};
use crate::domain::types::{
    EventRecord, NewTransaction, OperationRecord, SignatureRecord, StateChangeRecord,
    StoredTransaction, User, Wallet,
};

/// Network tags treated as compatible with this pipeline's chain.
const COMPATIBLE_NETWORKS: [&str; 3] = ["stellar", "xlm", "soroban"];

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl PostgresConfig {
    #[must_use]
    pub fn new(database_url: String) -> Self {
        Self {
            database_url,
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!("database pool ready, migrations applied");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_transaction(row: &PgRow) -> Result<StoredTransaction, sqlx::Error> {
    Ok(StoredTransaction {
        id: row.try_get("id")?,
        transaction_id: row.try_get("transaction_id")?,
        transaction_hash: row.try_get("transaction_hash")?,
        ledger: row.try_get("ledger")?,
        timestamp: row.try_get("timestamp")?,
        protocol: row.try_get("protocol")?,
        chain: row.try_get("chain")?,
        paging_token: row.try_get("paging_token")?,
        message: row.try_get("message")?,
        source_account: row.try_get("source_account")?,
        fee: row.try_get("fee")?,
        seq_num: row.try_get("seq_num")?,
        memo: row.try_get("memo")?,
        fee_charged: row.try_get("fee_charged")?,
        return_value: row.try_get("return_value")?,
        is_successful: row.try_get("is_successful")?,
        error_details: row.try_get("error_details")?,
        raw_webhook_data: row.try_get("raw_webhook_data")?,
        source_wallet_id: row.try_get("source_wallet_id")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_wallet(row: &PgRow) -> Result<Wallet, sqlx::Error> {
    Ok(Wallet {
        id: row.try_get("id")?,
        alias: row.try_get("alias")?,
        address: row.try_get("address")?,
        user_id: row.try_get("user_id")?,
        network: row.try_get("network")?,
    })
}

#[async_trait]
impl TransactionStore for PostgresStore {
    #[instrument(skip(self))]
    async fn find_by_hash(&self, hash: &str) -> Result<Option<StoredTransaction>, DatabaseError> {
        let row = sqlx::query("SELECT * FROM soroban_transactions WHERE transaction_hash = $1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_transaction).transpose().map_err(Into::into)
    }

    /// Upsert keyed by transaction hash.
    ///
    /// The update branch only refreshes `updated_at` and fills a missing
    /// wallet/user association; children are untouched. `xmax = 0` on the
    /// returned row distinguishes a fresh insert from a conflict update.
    #[instrument(skip_all, fields(tx_hash = %tx.transaction_hash))]
    async fn upsert_transaction(
        &self,
        tx: &NewTransaction,
    ) -> Result<(StoredTransaction, bool), DatabaseError> {
        let row = sqlx::query(
            r#"
            INSERT INTO soroban_transactions (
                id, transaction_id, transaction_hash, ledger, timestamp,
                protocol, chain, paging_token, message, source_account,
                fee, seq_num, memo, fee_charged, return_value,
                is_successful, error_details, raw_webhook_data,
                source_wallet_id, user_id
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
            )
            ON CONFLICT (transaction_hash) DO UPDATE SET
                updated_at = now(),
                source_wallet_id = COALESCE(soroban_transactions.source_wallet_id, EXCLUDED.source_wallet_id),
                user_id = COALESCE(soroban_transactions.user_id, EXCLUDED.user_id)
            RETURNING *, (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&tx.transaction_id)
        .bind(&tx.transaction_hash)
        .bind(tx.ledger)
        .bind(tx.timestamp)
        .bind(tx.protocol)
        .bind(&tx.chain)
        .bind(&tx.paging_token)
        .bind(&tx.message)
        .bind(&tx.source_account)
        .bind(tx.fee)
        .bind(tx.seq_num)
        .bind(&tx.memo)
        .bind(tx.fee_charged)
        .bind(&tx.return_value)
        .bind(tx.is_successful)
        .bind(&tx.error_details)
        .bind(&tx.raw_webhook_data)
        .bind(tx.source_wallet_id)
        .bind(tx.user_id)
        .fetch_one(&self.pool)
        .await?;

        let stored = map_transaction(&row)?;
        let inserted: bool = row.try_get("inserted")?;
        Ok((stored, inserted))
    }

    #[instrument(skip_all, fields(count = records.len()))]
    async fn insert_operations(&self, records: &[OperationRecord]) -> Result<(), DatabaseError> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO soroban_operations (
                    transaction_id, operation_index, operation_type,
                    source_account, contract_address, function_name, args, auth,
                    raw_operation
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(record.transaction_id)
            .bind(record.operation_index)
            .bind(&record.operation_type)
            .bind(&record.source_account)
            .bind(&record.contract_address)
            .bind(&record.function_name)
            .bind(&record.args)
            .bind(&record.auth)
            .bind(&record.raw_operation)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(count = records.len()))]
    async fn insert_events(&self, records: &[EventRecord]) -> Result<(), DatabaseError> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO soroban_events (
                    transaction_id, event_index, event_type, contract_id,
                    topics, data, in_successful_call, diagnostic, raw_event
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(record.transaction_id)
            .bind(record.event_index)
            .bind(&record.event_type)
            .bind(&record.contract_id)
            .bind(&record.topics)
            .bind(&record.data)
            .bind(record.in_successful_call)
            .bind(record.diagnostic)
            .bind(&record.raw_event)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(count = records.len()))]
    async fn insert_state_changes(
        &self,
        records: &[StateChangeRecord],
    ) -> Result<(), DatabaseError> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO soroban_state_changes (
                    transaction_id, change_index, direction, change_kind,
                    affected_address, change_data
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(record.transaction_id)
            .bind(record.change_index)
            .bind(record.direction.as_str())
            .bind(&record.change_kind)
            .bind(&record.affected_address)
            .bind(&record.change_data)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(count = records.len()))]
    async fn insert_signatures(&self, records: &[SignatureRecord]) -> Result<(), DatabaseError> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO soroban_signatures (
                    transaction_id, signature_index, hint, signature
                )
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(record.transaction_id)
            .bind(record.signature_index)
            .bind(&record.hint)
            .bind(&record.signature)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_transactions_by_wallet(
        &self,
        wallet_id: Uuid,
        limit: i64,
    ) -> Result<Vec<StoredTransaction>, DatabaseError> {
        let rows = sqlx::query(
            r#"
            SELECT t.* FROM soroban_transactions t
            WHERE t.source_wallet_id = $1
               OR t.source_account IN (SELECT address FROM wallets WHERE id = $1)
            ORDER BY t.timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(wallet_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_transaction).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(())
    }
}

#[async_trait]
impl WalletStore for PostgresStore {
    #[instrument(skip_all, fields(count = addresses.len()))]
    async fn find_by_addresses(&self, addresses: &[String]) -> Result<Vec<Wallet>, DatabaseError> {
        let networks: Vec<String> = COMPATIBLE_NETWORKS.iter().map(|s| s.to_string()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, alias, address, user_id, network FROM wallets
            WHERE address = ANY($1)
              AND (network IS NULL OR lower(network) = ANY($2))
            "#,
        )
        .bind(addresses)
        .bind(networks)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_wallet).collect::<Result<_, _>>().map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn find_by_address(&self, address: &str) -> Result<Option<Wallet>, DatabaseError> {
        let row = sqlx::query(
            "SELECT id, alias, address, user_id, network FROM wallets WHERE address = $1",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_wallet).transpose().map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn find_currency_by_contract(
        &self,
        contract_address: &str,
    ) -> Result<Option<String>, DatabaseError> {
        let currency: Option<String> = sqlx::query_scalar(
            r#"
            SELECT currency FROM wallet_balances
            WHERE contract_address = $1 AND currency IS NOT NULL
            LIMIT 1
            "#,
        )
        .bind(contract_address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(currency)
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self))]
    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query("SELECT id, email, name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            Ok(User {
                id: row.try_get("id")?,
                email: row.try_get("email")?,
                name: row.try_get("name")?,
            })
        })
        .transpose()
        .map_err(|e: sqlx::Error| e.into())
    }
}
