//! Typed model of the Soroban indexer webhook payload.
//!
//! The indexer delivers a deeply nested, weakly-typed JSON envelope. The
//! skeleton the pipeline depends on (transaction variants, operations,
//! events, result codes) is modeled with structs; leaves whose shape varies
//! by contract are kept as `serde_json::Value` and probed by the extractors.
//!
//! Everything downstream goes through [`TxBody::canonical`], which unwraps
//! the regular vs fee-bump variants to one inner transaction view.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ValidationError;

/// Top-level webhook payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SorobanHook {
    #[serde(default, rename = "eventType")]
    pub event_type: Option<String>,
    pub data: HookData,
}

/// A parsed webhook together with the verbatim JSON it came from.
///
/// The raw value is persisted with the transaction for audit/replay, so it
/// must be captured before the typed model drops unknown fields.
#[derive(Debug, Clone)]
pub struct ParsedHook {
    pub hook: SorobanHook,
    pub raw: Value,
}

impl ParsedHook {
    /// Parse a request body, retaining the raw JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_slice(bytes)?;
        let hook: SorobanHook = serde_json::from_value(raw.clone())?;
        Ok(Self { hook, raw })
    }

    /// Build from an already-materialized JSON value (used by tests).
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let hook: SorobanHook = serde_json::from_value(raw.clone())?;
        Ok(Self { hook, raw })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub ledger: i64,
    #[serde(default)]
    pub ts: i64,
    #[serde(default)]
    pub protocol: i32,
    #[serde(default)]
    pub body: TxBody,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub result: HookResult,
    #[serde(default)]
    pub paging_token: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub chain: String,
}

impl HookData {
    /// A transaction succeeded iff the result carries a non-empty success
    /// list and no failure section.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        let code = &self.result.result.result;
        code.tx_success.as_ref().is_some_and(|s| !s.is_empty()) && code.tx_failed.is_none()
    }
}

/// Tagged union of the two transaction envelope variants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx: Option<TxEnvelope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_fee_bump: Option<FeeBumpEnvelope>,
}

/// Borrowed view of the canonical inner transaction.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalTx<'a> {
    pub tx: &'a Transaction,
    pub signatures: &'a [SignatureEntry],
    pub source_account: &'a str,
}

impl TxBody {
    /// Unwrap to the canonical inner transaction.
    ///
    /// Fee-bump envelopes carry the payment semantics in their inner
    /// transaction; the wrapper only pays the fee.
    pub fn canonical(&self) -> Result<CanonicalTx<'_>, ValidationError> {
        let envelope = if let Some(env) = &self.tx {
            env
        } else if let Some(bump) = &self.tx_fee_bump {
            &bump.tx.inner_tx.tx
        } else {
            return Err(ValidationError::UnknownTxShape);
        };

        if envelope.tx.source_account.is_empty() {
            return Err(ValidationError::MissingSourceAccount);
        }

        Ok(CanonicalTx {
            tx: &envelope.tx,
            signatures: &envelope.signatures,
            source_account: &envelope.tx.source_account,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxEnvelope {
    pub tx: Transaction,
    #[serde(default)]
    pub signatures: Vec<SignatureEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeBumpEnvelope {
    pub tx: FeeBumpTx,
    #[serde(default)]
    pub signatures: Vec<SignatureEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeBumpTx {
    #[serde(default)]
    pub fee_source: String,
    #[serde(default)]
    pub fee: i64,
    pub inner_tx: InnerTx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerTx {
    pub tx: TxEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub source_account: String,
    #[serde(default)]
    pub fee: i64,
    #[serde(default)]
    pub seq_num: i64,
    #[serde(default)]
    pub cond: Value,
    /// Either a plain string ("none" when absent) or a structured variant
    #[serde(default)]
    pub memo: Value,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub ext: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureEntry {
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account: Option<String>,
    #[serde(default)]
    pub body: OperationBody,
}

impl Operation {
    /// Classify the operation for storage.
    #[must_use]
    pub fn operation_type(&self) -> String {
        if self.body.invoke_host_function.is_some() {
            "invoke_host_function".to_string()
        } else if self.body.invoke_contract.is_some() {
            "invoke_contract".to_string()
        } else {
            self.body
                .other
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| "unknown".to_string())
        }
    }

    /// The contract invocation carried by this operation, regardless of
    /// which encoding the indexer used.
    #[must_use]
    pub fn invocation(&self) -> Option<&InvokeContract> {
        if let Some(host) = &self.body.invoke_host_function {
            if let Some(invoke) = &host.host_function.invoke_contract {
                return Some(invoke);
            }
        }
        self.body.invoke_contract.as_ref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_contract: Option<InvokeContract>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_host_function: Option<InvokeHostFunction>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeContract {
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvokeHostFunction {
    #[serde(default)]
    pub host_function: HostFunction,
    #[serde(default)]
    pub auth: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostFunction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_contract: Option<InvokeContract>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub v3: MetaV3,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaV3 {
    #[serde(default)]
    pub ext: Value,
    #[serde(default)]
    pub tx_changes_before: Vec<Value>,
    #[serde(default)]
    pub operations: Vec<Value>,
    #[serde(default)]
    pub tx_changes_after: Vec<Value>,
    #[serde(default)]
    pub soroban_meta: SorobanMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SorobanMeta {
    #[serde(default)]
    pub ext: Value,
    #[serde(default)]
    pub events: Vec<SorobanEvent>,
    #[serde(default)]
    pub return_value: Value,
    #[serde(default)]
    pub diagnostic_events: Vec<DiagnosticEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SorobanEvent {
    #[serde(default)]
    pub ext: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    // The indexer is inconsistent about this field name
    #[serde(default, rename = "type", alias = "type_")]
    pub event_type: String,
    #[serde(default)]
    pub body: EventBody,
}

impl SorobanEvent {
    #[must_use]
    pub fn topics(&self) -> &[Value] {
        self.body.v0.as_ref().map_or(&[], |v0| v0.topics.as_slice())
    }

    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.body.v0.as_ref().map(|v0| &v0.data)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v0: Option<EventBodyV0>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventBodyV0 {
    #[serde(default)]
    pub topics: Vec<Value>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    #[serde(default)]
    pub in_successful_contract_call: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<SorobanEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookResult {
    #[serde(default)]
    pub transaction_hash: String,
    #[serde(default)]
    pub result: ResultBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultBody {
    #[serde(default)]
    pub fee_charged: i64,
    #[serde(default)]
    pub result: ResultCode,
    #[serde(default)]
    pub ext: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultCode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_success: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_failed: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn regular_hook() -> SorobanHook {
        serde_json::from_value(json!({
            "eventType": "get_contract_transaction",
            "data": {
                "id": "746491085852672",
                "hash": "b5a9984951",
                "ledger": 173806,
                "ts": 1751137259,
                "protocol": 22,
                "body": {
                    "tx": {
                        "tx": {
                            "source_account": "GDLS6OIZ3TOC7NXHB3OZKHXLUEZV4EUANOMOOMOHUZAZHLLGNN43IALX",
                            "fee": 115317,
                            "seq_num": 297271866425360i64,
                            "memo": "none",
                            "operations": []
                        },
                        "signatures": [{"hint": "666b79b4", "signature": "deadbeef"}]
                    }
                },
                "result": {
                    "transaction_hash": "b5a9984951",
                    "result": {
                        "fee_charged": 64167,
                        "result": { "tx_success": [{}] }
                    }
                },
                "chain": "stellar"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_canonical_regular_transaction() {
        let hook = regular_hook();
        let canonical = hook.data.body.canonical().unwrap();
        assert_eq!(
            canonical.source_account,
            "GDLS6OIZ3TOC7NXHB3OZKHXLUEZV4EUANOMOOMOHUZAZHLLGNN43IALX"
        );
        assert_eq!(canonical.tx.fee, 115317);
        assert_eq!(canonical.signatures.len(), 1);
        assert_eq!(canonical.signatures[0].hint, "666b79b4");
    }

    #[test]
    fn test_canonical_fee_bump_unwraps_inner() {
        let hook: SorobanHook = serde_json::from_value(json!({
            "data": {
                "hash": "abc",
                "body": {
                    "tx_fee_bump": {
                        "tx": {
                            "fee_source": "GFEESOURCE",
                            "fee": 200,
                            "inner_tx": {
                                "tx": {
                                    "tx": {
                                        "source_account": "GINNERSOURCE",
                                        "fee": 100,
                                        "seq_num": 7,
                                        "memo": "none",
                                        "operations": []
                                    },
                                    "signatures": [{"hint": "aa", "signature": "bb"}]
                                }
                            }
                        },
                        "signatures": []
                    }
                }
            }
        }))
        .unwrap();

        let canonical = hook.data.body.canonical().unwrap();
        assert_eq!(canonical.source_account, "GINNERSOURCE");
        assert_eq!(canonical.tx.fee, 100);
        assert_eq!(canonical.signatures.len(), 1);
    }

    #[test]
    fn test_canonical_unknown_shape() {
        let hook: SorobanHook =
            serde_json::from_value(json!({ "data": { "hash": "x", "body": {} } })).unwrap();
        assert!(matches!(
            hook.data.body.canonical(),
            Err(ValidationError::UnknownTxShape)
        ));
    }

    #[test]
    fn test_is_successful_requires_success_and_no_failure() {
        let hook = regular_hook();
        assert!(hook.data.is_successful());

        let failed: SorobanHook = serde_json::from_value(json!({
            "data": {
                "hash": "x",
                "result": { "result": { "result": { "tx_failed": ["op_failed"] } } }
            }
        }))
        .unwrap();
        assert!(!failed.data.is_successful());

        // Empty success list is not a success
        let empty: SorobanHook = serde_json::from_value(json!({
            "data": {
                "hash": "x",
                "result": { "result": { "result": { "tx_success": [] } } }
            }
        }))
        .unwrap();
        assert!(!empty.data.is_successful());
    }

    #[test]
    fn test_operation_type_classification() {
        let op: Operation = serde_json::from_value(json!({
            "body": {
                "invoke_host_function": {
                    "host_function": {
                        "invoke_contract": {
                            "contract_address": "CCONTRACT",
                            "function_name": "transfer",
                            "args": []
                        }
                    },
                    "auth": []
                }
            }
        }))
        .unwrap();
        assert_eq!(op.operation_type(), "invoke_host_function");
        assert_eq!(op.invocation().unwrap().function_name, "transfer");

        let legacy: Operation = serde_json::from_value(json!({
            "body": {
                "invoke_contract": {
                    "contract_address": "CCONTRACT",
                    "function_name": "pay",
                    "args": []
                }
            }
        }))
        .unwrap();
        assert_eq!(legacy.operation_type(), "invoke_contract");

        let other: Operation = serde_json::from_value(json!({
            "body": { "payment": { "destination": "GDEST" } }
        }))
        .unwrap();
        assert_eq!(other.operation_type(), "payment");
    }

    #[test]
    fn test_event_type_field_alias() {
        let event: SorobanEvent = serde_json::from_value(json!({
            "type_": "contract",
            "body": { "v0": { "topics": ["transfer"], "data": 5 } }
        }))
        .unwrap();
        assert_eq!(event.event_type, "contract");
        assert_eq!(event.topics().len(), 1);

        let event: SorobanEvent = serde_json::from_value(json!({
            "type": "diagnostic",
            "body": {}
        }))
        .unwrap();
        assert_eq!(event.event_type, "diagnostic");
        assert!(event.topics().is_empty());
        assert!(event.data().is_none());
    }

    #[test]
    fn test_parsed_hook_retains_raw() {
        let body = serde_json::to_vec(&json!({
            "data": { "hash": "abc", "body": {}, "unmodeled_field": 42 }
        }))
        .unwrap();
        let parsed = ParsedHook::from_slice(&body).unwrap();
        assert_eq!(parsed.hook.data.hash, "abc");
        assert_eq!(parsed.raw["data"]["unmodeled_field"], 42);
    }
}
