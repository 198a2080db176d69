//! Webhook processing pipeline.
//!
//! Orchestrates dedup, extraction, wallet resolution, persistence, and
//! notification for each delivered transaction. Collaborators are trait
//! objects so the pipeline can be exercised against mocks.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::envelope::{CanonicalTx, HookData, ParsedHook};
use crate::domain::error::{AppError, DatabaseError};
use crate::domain::traits::{EmailNotifier, TransactionStore, UserStore, WalletStore};
use crate::domain::types::{
    format_display_amount, ChangeDirection, Confidence, EventRecord, NewTransaction,
    OperationRecord, PaymentDetails, SignatureRecord, StateChangeRecord, StoredTransaction,
    WalletMapping, WebhookResponse, NATIVE_CURRENCY,
};
use crate::extract::{extract_addresses, extract_payment_details, is_stellar_address};

use super::cache::ProcessedCache;

/// Token contracts whose currency is known without a database lookup.
/// Mainnet Stellar Asset Contract addresses.
const KNOWN_CONTRACT_CURRENCIES: [(&str, &str); 3] = [
    ("CAS3J7GYLGXMF6TDJBBYYSE3HQ6BBSMLNUQ34T6TZMYMW2EVH34XOWMA", "XLM"),
    ("CCW67TSZV3SSS2HXMBQ5JFGCKJNXKZM7UQUWUZPUTHXSTZLEO7SJMI75", "USDC"),
    ("CDTKPWPLOURQA2SGTKTUQOWRCBZEORB4BWBOMJ3D3ZKQQYGVZMVWQOMQ", "EURC"),
];

/// Select the mapping the persisted transaction is associated with.
///
/// Preference order: the mapping whose address is the transaction's source
/// account, else the first high-confidence mapping, else the first mapping.
#[must_use]
pub fn determine_primary_mapping<'a>(
    mappings: &'a [WalletMapping],
    source_account: &str,
) -> Option<&'a WalletMapping> {
    mappings
        .iter()
        .find(|m| m.address == source_account)
        .or_else(|| mappings.iter().find(|m| m.confidence == Confidence::High))
        .or_else(|| mappings.first())
}

pub struct WebhookService {
    transactions: Arc<dyn TransactionStore>,
    wallets: Arc<dyn WalletStore>,
    users: Arc<dyn UserStore>,
    email: Arc<dyn EmailNotifier>,
    cache: Arc<ProcessedCache>,
}

impl WebhookService {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        wallets: Arc<dyn WalletStore>,
        users: Arc<dyn UserStore>,
        email: Arc<dyn EmailNotifier>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            transactions,
            wallets,
            users,
            email,
            cache: Arc::new(ProcessedCache::new(cache_ttl)),
        }
    }

    #[must_use]
    pub fn cache(&self) -> Arc<ProcessedCache> {
        Arc::clone(&self.cache)
    }

    /// Process one delivered webhook end to end.
    #[instrument(skip_all, fields(tx_hash = %parsed.hook.data.hash))]
    pub async fn process_webhook(&self, parsed: &ParsedHook) -> Result<WebhookResponse, AppError> {
        let data = &parsed.hook.data;
        if data.hash.is_empty() || data.id.is_empty() {
            info!("envelope missing transaction hash or id, acknowledging without processing");
            return Ok(WebhookResponse::ack(
                "Webhook acknowledged: missing transaction hash or id",
            ));
        }

        if let Some(cached) = self.cache.get(&data.hash) {
            info!("duplicate delivery resolved from cache");
            return Ok(duplicate_response(&cached.transaction, cached.mappings.len()));
        }
        if let Some(existing) = self.transactions.find_by_hash(&data.hash).await? {
            info!("duplicate delivery resolved from store");
            let mappings = self.find_matching_wallets(data).await?;
            self.cache
                .insert(data.hash.clone(), existing.clone(), mappings.clone());
            return Ok(duplicate_response(&existing, mappings.len()));
        }

        let details = extract_payment_details(data)?;
        let mappings = self.find_matching_wallets(data).await?;
        let primary = determine_primary_mapping(&mappings, &details.sender);

        let new_tx = build_transaction(parsed, &details, primary)?;
        let (stored, inserted) = match self.transactions.upsert_transaction(&new_tx).await {
            Ok(result) => result,
            // Lost a write race against a concurrent delivery of the same
            // hash. The winner's record is the truth.
            Err(DatabaseError::Duplicate(_)) => {
                warn!("concurrent duplicate insert, fetching winning record");
                let existing = self.transactions.find_by_hash(&data.hash).await?.ok_or_else(
                    || AppError::Internal("duplicate reported but record not found".to_string()),
                )?;
                (existing, false)
            }
            Err(e) => return Err(e.into()),
        };

        if inserted {
            self.store_related_records(&stored, data).await;
        }

        self.cache
            .insert(data.hash.clone(), stored.clone(), mappings.clone());

        if inserted && stored.is_successful && !mappings.is_empty() {
            self.dispatch_notifications(&stored, &details, &mappings).await;
        }

        info!(
            inserted,
            mappings = mappings.len(),
            successful = stored.is_successful,
            "webhook processed"
        );

        Ok(WebhookResponse {
            message: "Webhook processed successfully".to_string(),
            transaction_hash: Some(stored.transaction_hash.clone()),
            source_account: Some(details.sender.clone()),
            recipient_account: details.recipient.clone(),
            payment_amount: details.amount.map(|a| a.to_string()),
            transfer_type: details.transfer_type.clone(),
            is_new_transaction: Some(inserted),
            wallet_mappings_found: Some(mappings.len()),
            storage_status: Some(if inserted { "stored" } else { "duplicate" }.to_string()),
        })
    }

    /// Batch-resolve every address in the envelope against registered
    /// wallets.
    async fn find_matching_wallets(
        &self,
        data: &HookData,
    ) -> Result<Vec<WalletMapping>, DatabaseError> {
        let addresses: Vec<String> = extract_addresses(data).into_iter().collect();
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let wallets = self.wallets.find_by_addresses(&addresses).await?;
        Ok(wallets
            .into_iter()
            .map(|wallet| WalletMapping {
                wallet_id: wallet.id,
                address: wallet.address,
                user_id: wallet.user_id,
                confidence: Confidence::High,
                reason: "Direct address match".to_string(),
            })
            .collect())
    }

    /// Persist child collections for a newly created transaction.
    ///
    /// Each collection is written independently; a failure in one is logged
    /// and does not abort the others.
    async fn store_related_records(&self, stored: &StoredTransaction, data: &HookData) {
        let Ok(canonical) = data.body.canonical() else {
            return;
        };

        if let Err(e) = self
            .transactions
            .insert_operations(&build_operation_records(stored.id, &canonical))
            .await
        {
            warn!(error = %e, "failed to store operations");
        }
        if let Err(e) = self
            .transactions
            .insert_events(&build_event_records(stored.id, data))
            .await
        {
            warn!(error = %e, "failed to store events");
        }
        if let Err(e) = self
            .transactions
            .insert_state_changes(&build_state_change_records(stored.id, data))
            .await
        {
            warn!(error = %e, "failed to store state changes");
        }
        if let Err(e) = self
            .transactions
            .insert_signatures(&build_signature_records(stored.id, &canonical))
            .await
        {
            warn!(error = %e, "failed to store signatures");
        }
    }

    /// Email every mapped user about a received payment. Failures for one
    /// recipient never block the rest.
    #[instrument(skip_all, fields(tx_hash = %stored.transaction_hash))]
    async fn dispatch_notifications(
        &self,
        stored: &StoredTransaction,
        details: &PaymentDetails,
        mappings: &[WalletMapping],
    ) {
        let currency = self.resolve_currency(details.contract_address.as_deref()).await;
        let display_amount = format_display_amount(details.amount.unwrap_or(0));
        let sender_name = self.resolve_sender_name(&details.sender).await;

        for mapping in mappings {
            let user = match self.users.find_by_id(mapping.user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    warn!(user_id = mapping.user_id, "mapped user not found, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(user_id = mapping.user_id, error = %e, "user lookup failed, skipping");
                    continue;
                }
            };
            let Some(email) = user.email.as_deref() else {
                warn!(user_id = user.id, "user has no email, skipping");
                continue;
            };
            let name = user.name.as_deref().unwrap_or("there");

            if let Err(e) = self
                .email
                .send_payment_received(
                    email,
                    name,
                    &display_amount,
                    &currency,
                    &stored.transaction_hash,
                    &sender_name,
                )
                .await
            {
                error!(user_id = user.id, error = %e, "payment notification failed");
            } else {
                info!(user_id = user.id, "payment notification sent");
            }
        }
    }

    /// Static table first, then wallet-balance records, then native default.
    async fn resolve_currency(&self, contract_address: Option<&str>) -> String {
        let Some(contract) = contract_address else {
            return NATIVE_CURRENCY.to_string();
        };
        if let Some((_, currency)) = KNOWN_CONTRACT_CURRENCIES
            .iter()
            .find(|(addr, _)| *addr == contract)
        {
            return (*currency).to_string();
        }
        match self.wallets.find_currency_by_contract(contract).await {
            Ok(Some(currency)) => currency,
            Ok(None) => NATIVE_CURRENCY.to_string(),
            Err(e) => {
                warn!(contract, error = %e, "currency lookup failed, using native default");
                NATIVE_CURRENCY.to_string()
            }
        }
    }

    async fn resolve_sender_name(&self, sender: &str) -> String {
        match self.wallets.find_by_address(sender).await {
            Ok(Some(wallet)) => wallet.alias.unwrap_or_else(|| shorten_address(sender)),
            Ok(None) => shorten_address(sender),
            Err(e) => {
                warn!(error = %e, "sender wallet lookup failed");
                shorten_address(sender)
            }
        }
    }

    pub async fn get_transaction(&self, hash: &str) -> Result<StoredTransaction, AppError> {
        self.transactions
            .find_by_hash(hash)
            .await?
            .ok_or_else(|| AppError::Database(DatabaseError::NotFound(format!("transaction {hash}"))))
    }

    pub async fn get_wallet_transactions(
        &self,
        wallet_id: Uuid,
        limit: i64,
    ) -> Result<Vec<StoredTransaction>, AppError> {
        Ok(self
            .transactions
            .find_transactions_by_wallet(wallet_id, limit)
            .await?)
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.transactions.health_check().await
    }
}

fn duplicate_response(stored: &StoredTransaction, mappings_found: usize) -> WebhookResponse {
    WebhookResponse {
        message: "Transaction already processed".to_string(),
        transaction_hash: Some(stored.transaction_hash.clone()),
        source_account: Some(stored.source_account.clone()),
        is_new_transaction: Some(false),
        wallet_mappings_found: Some(mappings_found),
        storage_status: Some("duplicate".to_string()),
        ..WebhookResponse::default()
    }
}

fn shorten_address(address: &str) -> String {
    if address.len() > 12 {
        format!("{}...{}", &address[..6], &address[address.len() - 6..])
    } else {
        address.to_string()
    }
}

fn build_transaction(
    parsed: &ParsedHook,
    details: &PaymentDetails,
    primary: Option<&WalletMapping>,
) -> Result<NewTransaction, AppError> {
    let data = &parsed.hook.data;
    let canonical = data.body.canonical()?;

    let timestamp = DateTime::<Utc>::from_timestamp(data.ts, 0).unwrap_or_else(Utc::now);
    let is_successful = data.is_successful();

    let return_value = match &data.meta.v3.soroban_meta.return_value {
        Value::Null => None,
        value => serde_json::to_string(value).ok(),
    };
    let error_details = if is_successful {
        None
    } else {
        data.result
            .result
            .result
            .tx_failed
            .as_ref()
            .and_then(|failed| serde_json::to_string(failed).ok())
    };

    Ok(NewTransaction {
        transaction_id: data.id.clone(),
        transaction_hash: data.hash.clone(),
        ledger: data.ledger,
        timestamp,
        protocol: data.protocol,
        chain: data.chain.clone(),
        paging_token: data.paging_token.clone(),
        message: data.message.clone(),
        source_account: details.sender.clone(),
        fee: canonical.tx.fee,
        seq_num: canonical.tx.seq_num,
        memo: details.memo.clone(),
        fee_charged: data.result.result.fee_charged,
        return_value,
        is_successful,
        error_details,
        raw_webhook_data: parsed.raw.clone(),
        source_wallet_id: primary.map(|m| m.wallet_id),
        user_id: primary.map(|m| m.user_id),
    })
}

fn build_operation_records(
    transaction_id: Uuid,
    canonical: &CanonicalTx<'_>,
) -> Vec<OperationRecord> {
    canonical
        .tx
        .operations
        .iter()
        .enumerate()
        .map(|(index, op)| {
            let invoke = op.invocation();
            OperationRecord {
                transaction_id,
                operation_index: index as i32,
                operation_type: op.operation_type(),
                source_account: op.source_account.clone(),
                contract_address: invoke.map(|i| i.contract_address.clone()),
                function_name: invoke.map(|i| i.function_name.clone()),
                args: invoke.map_or(Value::Null, |i| Value::Array(i.args.clone())),
                auth: op
                    .body
                    .invoke_host_function
                    .as_ref()
                    .map_or(Value::Null, |h| Value::Array(h.auth.clone())),
                raw_operation: serde_json::to_value(op).unwrap_or(Value::Null),
            }
        })
        .collect()
}

fn build_event_records(transaction_id: Uuid, data: &HookData) -> Vec<EventRecord> {
    let soroban = &data.meta.v3.soroban_meta;
    let mut records = Vec::with_capacity(soroban.events.len() + soroban.diagnostic_events.len());

    for (index, event) in soroban.events.iter().enumerate() {
        records.push(EventRecord {
            transaction_id,
            event_index: index as i32,
            event_type: event.event_type.clone(),
            contract_id: event.contract_id.clone(),
            topics: Value::Array(event.topics().to_vec()),
            data: event.data().cloned().unwrap_or(Value::Null),
            in_successful_call: true,
            diagnostic: false,
            raw_event: serde_json::to_value(event).unwrap_or(Value::Null),
        });
    }
    let offset = records.len();
    for (index, diag) in soroban.diagnostic_events.iter().enumerate() {
        let Some(event) = &diag.event else { continue };
        records.push(EventRecord {
            transaction_id,
            event_index: (offset + index) as i32,
            event_type: event.event_type.clone(),
            contract_id: event.contract_id.clone(),
            topics: Value::Array(event.topics().to_vec()),
            data: event.data().cloned().unwrap_or(Value::Null),
            in_successful_call: diag.in_successful_contract_call,
            diagnostic: true,
            raw_event: serde_json::to_value(event).unwrap_or(Value::Null),
        });
    }
    records
}

fn build_state_change_records(transaction_id: Uuid, data: &HookData) -> Vec<StateChangeRecord> {
    let meta = &data.meta.v3;
    let mut records = Vec::with_capacity(meta.tx_changes_before.len() + meta.tx_changes_after.len());
    let mut index = 0i32;

    for (direction, changes) in [
        (ChangeDirection::Before, &meta.tx_changes_before),
        (ChangeDirection::After, &meta.tx_changes_after),
    ] {
        for change in changes {
            records.push(StateChangeRecord {
                transaction_id,
                change_index: index,
                direction,
                change_kind: change_kind(change),
                affected_address: affected_address(change),
                change_data: change.clone(),
            });
            index += 1;
        }
    }
    records
}

/// First key of the change object, the ledger entry variant tag.
fn change_kind(change: &Value) -> String {
    change
        .as_object()
        .and_then(|obj| obj.keys().next().cloned())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Account a ledger change touches, read from the variants that carry one.
fn affected_address(change: &Value) -> Option<String> {
    ["state", "updated"].iter().find_map(|variant| {
        change
            .get(*variant)
            .and_then(|entry| entry.get("account_id"))
            .and_then(Value::as_str)
            .filter(|s| is_stellar_address(s))
            .map(str::to_string)
    })
}

fn build_signature_records(
    transaction_id: Uuid,
    canonical: &CanonicalTx<'_>,
) -> Vec<SignatureRecord> {
    canonical
        .signatures
        .iter()
        .enumerate()
        .map(|(index, sig)| SignatureRecord {
            transaction_id,
            signature_index: index as i32,
            hint: sig.hint.clone(),
            signature: sig.signature.clone(),
        })
        .collect()
}
