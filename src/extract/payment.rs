//! Best-effort recovery of payment intent from a transaction envelope.
//!
//! Contracts encode payments heterogeneously, so no single field is
//! authoritative. Extraction runs an ordered cascade of strategies, each a
//! pure probe over one envelope region, and stops looking for an amount as
//! soon as one strategy yields a positive value. Recipient and transfer
//! type are merged from whichever strategy saw them first.

use serde_json::Value;

use crate::domain::envelope::{CanonicalTx, DiagnosticEvent, HookData, SorobanEvent};
use crate::domain::error::ValidationError;
use crate::domain::types::PaymentDetails;

use super::address::is_stellar_address;
use super::memo::extract_memo;
use super::value::{as_address, first_positive_in_array, named_positive_amount, positive_amount};

/// Function names that indicate a value transfer.
const PAYMENT_FUNCTIONS: [&str; 5] = ["transfer", "send", "pay", "mint", "burn"];

/// Event topic keywords that indicate a value transfer.
const PAYMENT_TOPICS: [&str; 3] = ["transfer", "payment", "send"];

const AMOUNT_FIELDS: [&str; 3] = ["amount", "value", "balance"];
const EVENT_AMOUNT_FIELDS: [&str; 5] = ["amount", "value", "balance", "sum", "total"];
const RECIPIENT_FIELDS: [&str; 4] = ["to", "recipient", "destination", "address"];

/// What a single cascade stage managed to recover.
#[derive(Debug, Default)]
struct Partial {
    amount: Option<u128>,
    recipient: Option<String>,
    transfer_type: Option<String>,
}

/// Extract payment details from the envelope.
///
/// Fails only when the envelope's transaction shape is unrecognized or the
/// source account is missing. Everything else degrades to absent fields.
pub fn extract_payment_details(data: &HookData) -> Result<PaymentDetails, ValidationError> {
    let canonical = data.body.canonical()?;
    let sender = canonical.source_account.to_string();

    let mut details = PaymentDetails {
        sender: sender.clone(),
        ..PaymentDetails::default()
    };

    // Contract identity is independent of the amount cascade.
    details.contract_address = canonical
        .tx
        .operations
        .iter()
        .filter_map(|op| op.invocation())
        .map(|invoke| invoke.contract_address.clone())
        .find(|addr| !addr.is_empty());

    let soroban = &data.meta.v3.soroban_meta;
    merge(&mut details, from_operation_args(&canonical, &sender));
    if details.amount.is_none() {
        merge(&mut details, from_events(&soroban.events, &sender));
    }
    if details.amount.is_none() {
        merge(&mut details, from_state_changes(data, &sender));
    }
    if details.amount.is_none() {
        merge(&mut details, from_memo_amount(&canonical.tx.memo));
    }
    if details.amount.is_none() {
        merge(&mut details, from_diagnostic_events(&soroban.diagnostic_events));
    }

    details.memo = extract_memo(&canonical.tx.memo, data);

    Ok(details)
}

fn merge(details: &mut PaymentDetails, partial: Option<Partial>) {
    let Some(partial) = partial else { return };
    if details.amount.is_none() {
        details.amount = partial.amount;
    }
    if details.recipient.is_none() {
        details.recipient = partial.recipient;
    }
    if details.transfer_type.is_none() {
        details.transfer_type = partial.transfer_type;
    }
}

/// Stage 1: arguments of payment-named contract invocations.
fn from_operation_args(canonical: &CanonicalTx<'_>, sender: &str) -> Option<Partial> {
    let mut partial = Partial::default();

    for op in &canonical.tx.operations {
        let Some(invoke) = op.invocation() else { continue };
        let name = invoke.function_name.to_lowercase();
        if !PAYMENT_FUNCTIONS.iter().any(|kw| name.contains(kw)) {
            continue;
        }

        if partial.transfer_type.is_none() {
            partial.transfer_type = Some(invoke.function_name.clone());
        }

        if name.contains("transfer") && invoke.args.len() >= 3 {
            // SEP-41 convention: args are (from, to, amount)
            if partial.recipient.is_none() {
                partial.recipient = as_address(&invoke.args[1]).map(str::to_string);
            }
            if partial.amount.is_none() {
                partial.amount = positive_amount(&invoke.args[2]);
            }
        } else {
            scan_generic_args(&invoke.args, sender, &mut partial);
        }

        if partial.amount.is_some() {
            break;
        }
    }

    (partial.amount.is_some() || partial.recipient.is_some() || partial.transfer_type.is_some())
        .then_some(partial)
}

fn scan_generic_args(args: &[Value], sender: &str, partial: &mut Partial) {
    for arg in args {
        if partial.recipient.is_none() {
            partial.recipient = candidate_recipient(arg, sender);
        }
        if partial.amount.is_none() {
            partial.amount =
                positive_amount(arg).or_else(|| named_positive_amount(arg, &AMOUNT_FIELDS));
        }
    }
}

fn candidate_recipient(arg: &Value, sender: &str) -> Option<String> {
    match arg {
        Value::String(s) if looks_like_account(s) && s != sender => Some(s.clone()),
        Value::Object(obj) => ["address", "to", "destination"].iter().find_map(|field| {
            obj.get(*field)
                .and_then(Value::as_str)
                .filter(|s| looks_like_account(s) && *s != sender)
                .map(str::to_string)
        }),
        _ => None,
    }
}

fn looks_like_account(s: &str) -> bool {
    s.len() >= 40 && s.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Stage 2: contract events whose topics mention a transfer keyword.
fn from_events(events: &[SorobanEvent], sender: &str) -> Option<Partial> {
    for event in events {
        let keyword = event.topics().iter().find_map(|topic| {
            let s = topic.as_str()?.to_lowercase();
            PAYMENT_TOPICS.iter().find(|kw| s.contains(**kw)).copied()
        });
        let Some(keyword) = keyword else { continue };

        let mut partial = Partial {
            transfer_type: Some(keyword.to_string()),
            ..Partial::default()
        };

        partial.recipient = event
            .topics()
            .iter()
            .filter_map(as_address)
            .find(|addr| *addr != sender)
            .map(str::to_string);

        if let Some(data) = event.data() {
            if partial.recipient.is_none() {
                partial.recipient = RECIPIENT_FIELDS.iter().find_map(|field| {
                    data.get(*field)
                        .and_then(Value::as_str)
                        .filter(|s| is_stellar_address(s))
                        .map(str::to_string)
                });
            }
            partial.amount = positive_amount(data)
                .or_else(|| named_positive_amount(data, &EVENT_AMOUNT_FIELDS))
                .or_else(|| first_positive_in_array(data));
        }

        if partial.amount.is_some() || partial.recipient.is_some() {
            return Some(partial);
        }
    }
    None
}

/// Stage 3: ledger state changes surrounding the transaction.
fn from_state_changes(data: &HookData, sender: &str) -> Option<Partial> {
    let meta = &data.meta.v3;
    let mut partial = Partial::default();

    for change in meta.tx_changes_before.iter().chain(&meta.tx_changes_after) {
        probe_state_change(change, sender, &mut partial, 0);
        if partial.amount.is_some() && partial.recipient.is_some() {
            break;
        }
    }

    (partial.amount.is_some() || partial.recipient.is_some()).then_some(partial)
}

fn probe_state_change(value: &Value, sender: &str, partial: &mut Partial, depth: usize) {
    if depth > 8 {
        return;
    }
    match value {
        Value::Object(obj) => {
            if partial.recipient.is_none() {
                partial.recipient = obj
                    .get("account_id")
                    .and_then(Value::as_str)
                    .filter(|s| is_stellar_address(s) && *s != sender)
                    .map(str::to_string);
            }
            if partial.amount.is_none() {
                partial.amount = named_positive_amount(value, &AMOUNT_FIELDS);
            }
            for nested in obj.values() {
                probe_state_change(nested, sender, partial, depth + 1);
            }
        }
        Value::Array(items) => {
            for item in items {
                probe_state_change(item, sender, partial, depth + 1);
            }
        }
        _ => {}
    }
}

/// Stage 4: a leading numeric run in the memo text.
fn from_memo_amount(memo: &Value) -> Option<Partial> {
    let text = memo.as_str()?.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("none") {
        return None;
    }
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    let amount = digits.parse::<u128>().ok().filter(|a| *a > 0)?;
    Some(Partial {
        amount: Some(amount),
        ..Partial::default()
    })
}

/// Stage 5: diagnostic event payloads.
fn from_diagnostic_events(events: &[DiagnosticEvent]) -> Option<Partial> {
    for diag in events {
        let Some(data) = diag.event.as_ref().and_then(SorobanEvent::data) else {
            continue;
        };
        // first_positive_in_array also covers vectors of split 128-bit values
        let amount = positive_amount(data).or_else(|| first_positive_in_array(data));
        if amount.is_some() {
            return Some(Partial {
                amount,
                ..Partial::default()
            });
        }
    }
    None
}
