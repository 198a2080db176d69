//! Collection of every address-shaped string in a transaction envelope.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::domain::envelope::HookData;

/// Guard against pathologically nested argument trees.
const MAX_DEPTH: usize = 32;

/// Whether a string is a Stellar account (`G...`) or contract (`C...`)
/// address: 56 characters from the base32 alphabet.
#[must_use]
pub fn is_stellar_address(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 56 || !(bytes[0] == b'G' || bytes[0] == b'C') {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(b))
}

/// Collect every address appearing anywhere in the envelope: transaction
/// and operation source accounts, invocation targets and argument trees,
/// auth entries, event topics and data, diagnostic events, and state
/// changes.
#[must_use]
pub fn extract_addresses(data: &HookData) -> BTreeSet<String> {
    let mut out = BTreeSet::new();

    if let Ok(canonical) = data.body.canonical() {
        insert_if_address(&mut out, canonical.source_account);

        for op in &canonical.tx.operations {
            if let Some(source) = &op.source_account {
                insert_if_address(&mut out, source);
            }
            if let Some(invoke) = op.invocation() {
                insert_if_address(&mut out, &invoke.contract_address);
                for arg in &invoke.args {
                    collect_from_value(&mut out, arg, 0);
                }
            }
            if let Some(host) = &op.body.invoke_host_function {
                for auth in &host.auth {
                    collect_from_value(&mut out, auth, 0);
                }
            }
        }
    }

    let meta = &data.meta.v3;
    for event in &meta.soroban_meta.events {
        for topic in event.topics() {
            collect_from_value(&mut out, topic, 0);
        }
        if let Some(event_data) = event.data() {
            collect_from_value(&mut out, event_data, 0);
        }
        if let Some(contract_id) = &event.contract_id {
            insert_if_address(&mut out, contract_id);
        }
    }
    for diag in &meta.soroban_meta.diagnostic_events {
        if let Some(event) = &diag.event {
            for topic in event.topics() {
                collect_from_value(&mut out, topic, 0);
            }
            if let Some(event_data) = event.data() {
                collect_from_value(&mut out, event_data, 0);
            }
        }
    }
    for change in meta.tx_changes_before.iter().chain(&meta.tx_changes_after) {
        collect_from_value(&mut out, change, 0);
    }

    out
}

fn insert_if_address(out: &mut BTreeSet<String>, candidate: &str) {
    if is_stellar_address(candidate) {
        out.insert(candidate.to_string());
    }
}

fn collect_from_value(out: &mut BTreeSet<String>, value: &Value, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::String(s) => insert_if_address(out, s),
        Value::Array(items) => {
            for item in items {
                collect_from_value(out, item, depth + 1);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_from_value(out, item, depth + 1);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::SorobanHook;
    use serde_json::json;

    const SENDER: &str = "GDLS6OIZ3TOC7NXHB3OZKHXLUEZV4EUANOMOOMOHUZAZHLLGNN43IALX";
    const RECIPIENT: &str = "GBVFTZL5HIPT4PFQVTZVIWR77V7LWYCXU4CLYWWHHOEXB64XPG5LDMTU";
    const CONTRACT: &str = "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC";

    #[test]
    fn test_address_pattern() {
        assert!(is_stellar_address(SENDER));
        assert!(is_stellar_address(CONTRACT));
        assert!(!is_stellar_address("MDLS6OIZ3TOC7NXHB3OZKHXLUEZV4EUANOMOOMOHUZAZHLLGNN43IALX"));
        assert!(!is_stellar_address(&SENDER[..55]));
        assert!(!is_stellar_address(&format!("{}0", &SENDER[..55])));
        assert!(!is_stellar_address(""));
    }

    #[test]
    fn test_collects_from_every_envelope_region() {
        let hook: SorobanHook = serde_json::from_value(json!({
            "data": {
                "hash": "abc",
                "body": {
                    "tx": {
                        "tx": {
                            "source_account": SENDER,
                            "operations": [{
                                "body": {
                                    "invoke_host_function": {
                                        "host_function": {
                                            "invoke_contract": {
                                                "contract_address": CONTRACT,
                                                "function_name": "transfer",
                                                "args": [
                                                    {"address": SENDER},
                                                    {"nested": [{"deep": RECIPIENT}]},
                                                    {"i128": {"hi": 0, "lo": 5}}
                                                ]
                                            }
                                        },
                                        "auth": []
                                    }
                                }
                            }]
                        },
                        "signatures": []
                    }
                },
                "meta": {
                    "v3": {
                        "tx_changes_after": [
                            {"state": {"account_id": RECIPIENT, "balance": "100"}}
                        ],
                        "soroban_meta": {
                            "events": [{
                                "type": "contract",
                                "contract_id": CONTRACT,
                                "body": {"v0": {"topics": ["transfer", SENDER], "data": 1}}
                            }],
                            "diagnostic_events": [{
                                "in_successful_contract_call": true,
                                "event": {
                                    "type": "diagnostic",
                                    "body": {"v0": {"topics": [], "data": {"to": RECIPIENT}}}
                                }
                            }]
                        }
                    }
                }
            }
        }))
        .unwrap();

        let addresses = extract_addresses(&hook.data);
        assert!(addresses.contains(SENDER));
        assert!(addresses.contains(RECIPIENT));
        assert!(addresses.contains(CONTRACT));
        assert!(addresses.iter().all(|a| is_stellar_address(a)));
        assert_eq!(addresses.len(), 3);
    }

    #[test]
    fn test_depth_bound_does_not_recurse_forever() {
        let mut value = json!("leaf");
        for _ in 0..100 {
            value = json!({"wrap": value});
        }
        let mut out = BTreeSet::new();
        collect_from_value(&mut out, &value, 0);
        assert!(out.is_empty());
    }
}
