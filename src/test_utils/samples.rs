//! Canned envelopes and records for exercising the pipeline.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::domain::envelope::ParsedHook;
use crate::domain::types::{StoredTransaction, Wallet};

pub const SENDER: &str = "GDLS6OIZ3TOC7NXHB3OZKHXLUEZV4EUANOMOOMOHUZAZHLLGNN43IALX";
pub const RECIPIENT: &str = "GBVFTZL5HIPT4PFQVTZVIWR77V7LWYCXU4CLYWWHHOEXB64XPG5LDMTU";
pub const CONTRACT: &str = "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC";

/// A well-formed regular-transaction envelope carrying a token transfer
/// from [`SENDER`] to [`RECIPIENT`].
#[must_use]
pub fn sample_hook(hash: &str, amount: u64, successful: bool) -> ParsedHook {
    let result = if successful {
        json!({ "tx_success": [{"op_success": {}}] })
    } else {
        json!({ "tx_failed": ["op_failed"] })
    };

    ParsedHook::from_value(json!({
        "eventType": "get_contract_transaction",
        "data": {
            "id": format!("id-{hash}"),
            "hash": hash,
            "ledger": 173_806,
            "ts": 1_751_137_259,
            "protocol": 22,
            "chain": "stellar",
            "paging_token": "746491085852672",
            "message": "contract transaction",
            "body": {
                "tx": {
                    "tx": {
                        "source_account": SENDER,
                        "fee": 115_317,
                        "seq_num": 297_271_866_425_360i64,
                        "memo": "none",
                        "operations": [{
                            "body": {
                                "invoke_host_function": {
                                    "host_function": {
                                        "invoke_contract": {
                                            "contract_address": CONTRACT,
                                            "function_name": "transfer",
                                            "args": [
                                                {"address": SENDER},
                                                {"address": RECIPIENT},
                                                {"i128": {"hi": 0, "lo": amount}}
                                            ]
                                        }
                                    },
                                    "auth": []
                                }
                            }
                        }]
                    },
                    "signatures": [{"hint": "666b79b4", "signature": "c2ln"}]
                }
            },
            "meta": {
                "v3": {
                    "soroban_meta": {
                        "events": [{
                            "type": "contract",
                            "contract_id": CONTRACT,
                            "body": {"v0": {
                                "topics": ["transfer", SENDER, RECIPIENT],
                                "data": {"amount": {"i128": {"hi": 0, "lo": amount}}}
                            }}
                        }],
                        "return_value": true,
                        "diagnostic_events": []
                    },
                    "tx_changes_before": [],
                    "tx_changes_after": []
                }
            },
            "result": {
                "transaction_hash": hash,
                "result": {
                    "fee_charged": 64_167,
                    "result": result
                }
            }
        }
    }))
    .expect("sample hook must parse")
}

#[must_use]
pub fn sample_stored_transaction(hash: &str) -> StoredTransaction {
    let now = Utc::now();
    StoredTransaction {
        id: Uuid::new_v4(),
        transaction_id: format!("id-{hash}"),
        transaction_hash: hash.to_string(),
        ledger: 173_806,
        timestamp: now,
        protocol: 22,
        chain: "stellar".to_string(),
        paging_token: "746491085852672".to_string(),
        message: "contract transaction".to_string(),
        source_account: SENDER.to_string(),
        fee: 115_317,
        seq_num: 297_271_866_425_360,
        memo: None,
        fee_charged: 64_167,
        return_value: Some("true".to_string()),
        is_successful: true,
        error_details: None,
        raw_webhook_data: json!({}),
        source_wallet_id: None,
        user_id: None,
        created_at: now,
        updated_at: now,
    }
}

#[must_use]
pub fn sample_wallet(address: &str, user_id: i64) -> Wallet {
    Wallet {
        id: Uuid::new_v4(),
        alias: Some("Main wallet".to_string()),
        address: address.to_string(),
        user_id,
        network: Some("stellar".to_string()),
    }
}
