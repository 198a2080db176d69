//! Core data structures shared across the pipeline, persistence layer, and
//! API surface.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Smallest-unit divisor for 7-decimal Stellar assets.
pub const STROOPS_PER_UNIT: u128 = 10_000_000;

/// Currency assumed when no contract mapping is known.
pub const NATIVE_CURRENCY: &str = "XLM";

/// How confidently a wallet mapping was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown confidence level: {other}")),
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A wallet matched against an address found in a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WalletMapping {
    pub wallet_id: Uuid,
    pub address: String,
    pub user_id: i64,
    pub confidence: Confidence,
    pub reason: String,
}

/// A registered wallet row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Wallet {
    pub id: Uuid,
    pub alias: Option<String>,
    pub address: String,
    pub user_id: i64,
    pub network: Option<String>,
}

/// A notification recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Outcome of the payment-detail extraction cascade.
///
/// `amount` is `None` when no stage could recover a positive amount; callers
/// must not conflate that with a zero-value payment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentDetails {
    pub amount: Option<u128>,
    pub contract_address: Option<String>,
    pub sender: String,
    pub recipient: Option<String>,
    pub transfer_type: Option<String>,
    pub memo: Option<String>,
}

/// A persisted Soroban transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredTransaction {
    pub id: Uuid,
    pub transaction_id: String,
    pub transaction_hash: String,
    pub ledger: i64,
    pub timestamp: DateTime<Utc>,
    pub protocol: i32,
    pub chain: String,
    pub paging_token: String,
    pub message: String,
    pub source_account: String,
    pub fee: i64,
    pub seq_num: i64,
    pub memo: Option<String>,
    pub fee_charged: i64,
    pub return_value: Option<String>,
    pub is_successful: bool,
    pub error_details: Option<String>,
    #[schema(value_type = Object)]
    pub raw_webhook_data: Value,
    pub source_wallet_id: Option<Uuid>,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a transaction row prior to insertion.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub transaction_id: String,
    pub transaction_hash: String,
    pub ledger: i64,
    pub timestamp: DateTime<Utc>,
    pub protocol: i32,
    pub chain: String,
    pub paging_token: String,
    pub message: String,
    pub source_account: String,
    pub fee: i64,
    pub seq_num: i64,
    pub memo: Option<String>,
    pub fee_charged: i64,
    pub return_value: Option<String>,
    pub is_successful: bool,
    pub error_details: Option<String>,
    pub raw_webhook_data: Value,
    pub source_wallet_id: Option<Uuid>,
    pub user_id: Option<i64>,
}

/// One operation of a stored transaction.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub transaction_id: Uuid,
    pub operation_index: i32,
    pub operation_type: String,
    pub source_account: Option<String>,
    pub contract_address: Option<String>,
    pub function_name: Option<String>,
    pub args: Value,
    pub auth: Value,
    /// The operation as delivered, for audit and replay.
    pub raw_operation: Value,
}

/// One contract event of a stored transaction.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub transaction_id: Uuid,
    pub event_index: i32,
    pub event_type: String,
    pub contract_id: Option<String>,
    pub topics: Value,
    pub data: Value,
    pub in_successful_call: bool,
    pub diagnostic: bool,
    /// The event as delivered, for audit and replay.
    pub raw_event: Value,
}

/// Whether a ledger state change snapshot was taken before or after
/// operation application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDirection {
    Before,
    After,
}

impl ChangeDirection {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for ChangeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ledger state change of a stored transaction.
#[derive(Debug, Clone)]
pub struct StateChangeRecord {
    pub transaction_id: Uuid,
    pub change_index: i32,
    pub direction: ChangeDirection,
    /// First key of the change object, e.g. `state`, `updated`, `created`.
    pub change_kind: String,
    /// Account the change touches, when one can be read from it.
    pub affected_address: Option<String>,
    pub change_data: Value,
}

/// One signature of a stored transaction.
#[derive(Debug, Clone)]
pub struct SignatureRecord {
    pub transaction_id: Uuid,
    pub signature_index: i32,
    pub hint: String,
    pub signature: String,
}

/// Body returned to the webhook caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new_transaction: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_mappings_found: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_status: Option<String>,
}

impl WebhookResponse {
    /// Plain acknowledgement with no transaction detail.
    #[must_use]
    pub fn ack(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    #[must_use]
    pub fn new(database: HealthStatus) -> Self {
        Self {
            status: database,
            database,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// Render a raw token amount for display.
///
/// Amounts above one whole unit are scaled by the 7-decimal divisor and
/// trimmed of trailing zeros; smaller values pass through unscaled since the
/// asset's decimals cannot be assumed.
#[must_use]
pub fn format_display_amount(raw: u128) -> String {
    if raw <= STROOPS_PER_UNIT {
        return raw.to_string();
    }
    let whole = raw / STROOPS_PER_UNIT;
    let frac = raw % STROOPS_PER_UNIT;
    if frac == 0 {
        whole.to_string()
    } else {
        let frac = format!("{frac:07}");
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}
