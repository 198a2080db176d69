//! Probing helpers for the weakly-typed leaves of the webhook envelope.
//!
//! The indexer wraps scalars in single-key objects (`{"i128": {...}}`,
//! `{"u64": 5}`) or delivers them as bare numbers or numeric strings,
//! depending on the emitting contract. These helpers normalize all of those
//! to `u128` amounts or address strings.

use serde_json::Value;

use super::address::is_stellar_address;

/// Combine a split 128-bit integer encoding into a single amount.
///
/// `hi` and `lo` halves are joined as `hi * 2^32 + lo`. Negative halves mean
/// a negative amount, which is never a payment, so they decode to `None`.
pub fn decode_i128_parts(parts: &Value) -> Option<u128> {
    let hi = decode_half(parts.get("hi")?)?;
    let lo = decode_half(parts.get("lo")?)?;
    hi.checked_shl(32)?.checked_add(lo)
}

fn decode_half(v: &Value) -> Option<u128> {
    if let Some(n) = v.as_u64() {
        return Some(u128::from(n));
    }
    if let Some(n) = v.as_i64() {
        return if n >= 0 { Some(n as u128) } else { None };
    }
    v.as_str()?.trim().parse::<u128>().ok()
}

/// Decode any of the amount encodings the indexer produces.
///
/// Returns `Some(0)` for a genuine zero so callers can distinguish "decoded
/// as zero" from "not an amount at all".
pub fn decode_amount(v: &Value) -> Option<u128> {
    if let Some(n) = v.as_u64() {
        return Some(u128::from(n));
    }
    if let Some(n) = v.as_i64() {
        return if n >= 0 { Some(n as u128) } else { None };
    }
    if let Some(s) = v.as_str() {
        return s.trim().parse::<u128>().ok();
    }
    if let Some(obj) = v.as_object() {
        if let Some(parts) = obj.get("i128").or_else(|| obj.get("u128")) {
            return decode_i128_parts(parts);
        }
        for key in ["u64", "i64", "u32", "i32"] {
            if let Some(inner) = obj.get(key) {
                return decode_half(inner);
            }
        }
    }
    None
}

/// An amount usable by the extraction cascade: decoded and strictly positive.
pub fn positive_amount(v: &Value) -> Option<u128> {
    decode_amount(v).filter(|a| *a > 0)
}

/// Probe named fields of an object for a positive amount, in field order.
pub fn named_positive_amount(v: &Value, fields: &[&str]) -> Option<u128> {
    let obj = v.as_object()?;
    fields.iter().find_map(|f| obj.get(*f).and_then(positive_amount))
}

/// First positive amount inside an array value.
pub fn first_positive_in_array(v: &Value) -> Option<u128> {
    v.as_array()?.iter().find_map(positive_amount)
}

/// Unwrap a value to an address string, accepting either a bare address or
/// an `{"address": "..."}` wrapper.
pub fn as_address(v: &Value) -> Option<&str> {
    match v {
        Value::String(s) if is_stellar_address(s) => Some(s),
        Value::Object(obj) => obj
            .get("address")
            .and_then(Value::as_str)
            .filter(|s| is_stellar_address(s)),
        _ => None,
    }
}
