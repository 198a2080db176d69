//! Memo recovery, independent of amount extraction.

use serde_json::Value;

use crate::domain::envelope::HookData;

const MEMO_FIELDS: [&str; 5] = ["text", "memo_text", "value", "id", "hash"];

const MAX_DEPTH: usize = 16;

/// Resolve the transaction memo.
///
/// Tries the typed memo field first (plain string, then the known fields of
/// a structured memo variant, then stringification), and falls back to a
/// deep search for memo-named keys anywhere in the raw envelope.
#[must_use]
pub fn extract_memo(memo: &Value, data: &HookData) -> Option<String> {
    if let Some(found) = from_memo_value(memo) {
        return Some(found);
    }
    serde_json::to_value(data)
        .ok()
        .and_then(|raw| deep_search(&raw, 0))
}

fn from_memo_value(memo: &Value) -> Option<String> {
    match memo {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && !s.eq_ignore_ascii_case("none")).then(|| s.to_string())
        }
        Value::Object(obj) if !obj.is_empty() => {
            for field in MEMO_FIELDS {
                match obj.get(field) {
                    Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                    Some(Value::Number(n)) => return Some(n.to_string()),
                    _ => {}
                }
            }
            serde_json::to_string(memo).ok()
        }
        _ => None,
    }
}

fn deep_search(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::Object(obj) => {
            for (key, nested) in obj {
                if key.to_lowercase().contains("memo") {
                    if let Some(found) = from_memo_value(nested) {
                        return Some(found);
                    }
                }
                if let Some(found) = deep_search(nested, depth + 1) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| deep_search(item, depth + 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::SorobanHook;
    use serde_json::json;

    fn empty_data() -> HookData {
        let hook: SorobanHook =
            serde_json::from_value(json!({"data": {"hash": "h", "body": {}}})).unwrap();
        hook.data
    }

    #[test]
    fn test_plain_string_memo() {
        let data = empty_data();
        assert_eq!(
            extract_memo(&json!("invoice 42"), &data).as_deref(),
            Some("invoice 42")
        );
        assert_eq!(extract_memo(&json!("none"), &data), None);
        assert_eq!(extract_memo(&json!(""), &data), None);
    }

    #[test]
    fn test_structured_memo_fields() {
        let data = empty_data();
        assert_eq!(
            extract_memo(&json!({"memo_text": "hello"}), &data).as_deref(),
            Some("hello")
        );
        assert_eq!(extract_memo(&json!({"id": 12345}), &data).as_deref(), Some("12345"));
        // Unknown structure stringifies rather than dropping data.
        assert_eq!(
            extract_memo(&json!({"exotic": true}), &data).as_deref(),
            Some(r#"{"exotic":true}"#)
        );
    }

    #[test]
    fn test_deep_search_fallback() {
        let hook: SorobanHook = serde_json::from_value(json!({
            "data": {
                "hash": "h",
                "body": {},
                "meta": {"v3": {"tx_changes_after": [{"entry": {"memo_text": "buried"}}]}}
            }
        }))
        .unwrap();
        assert_eq!(
            extract_memo(&json!("none"), &hook.data).as_deref(),
            Some("buried")
        );
    }
}
