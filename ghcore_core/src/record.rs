//! Helpers for the loosely typed records that flow through resolution.
//!
//! Event-log rows, raw entity inputs and property dicts are all JSON objects.
//! "Unset" follows the event log's conventions: null, empty strings, zero and
//! empty collections all count as missing.

use serde_json::{Map, Value};

/// A loosely typed record keyed by column or field name.
pub type Record = Map<String, Value>;

const REFS_HEADS_PREFIX: &str = "refs/heads/";

/// Whether a value counts as set.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Get a value only when it is set.
#[must_use]
pub fn get_truthy<'a>(record: &'a Record, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|v| is_truthy(v))
}

/// Get a non-empty string value.
#[must_use]
pub fn get_str<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    get_truthy(record, key).and_then(Value::as_str)
}

/// Get an integer value, accepting numeric strings as the event log stores
/// some ids as text.
#[must_use]
pub fn get_i64(record: &Record, key: &str) -> Option<i64> {
    match get_truthy(record, key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Render a scalar for composite ids and query bindings.
///
/// Strings render without quotes; everything else uses its JSON form.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strip a leading `refs/heads/` from a push ref.
#[must_use]
pub fn trim_refs_heads(reference: &str) -> &str {
    reference
        .strip_prefix(REFS_HEADS_PREFIX)
        .unwrap_or(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_event_log_conventions() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!("redis/redis")));
        assert!(is_truthy(&json!(-3)));
        assert!(is_truthy(&json!(["a"])));
    }

    #[test]
    fn get_i64_accepts_numeric_strings() {
        let record = json!({"repo_id": "288431943", "issue_number": 12, "empty": ""});
        let record = record.as_object().cloned().unwrap_or_default();
        assert_eq!(get_i64(&record, "repo_id"), Some(288_431_943));
        assert_eq!(get_i64(&record, "issue_number"), Some(12));
        assert_eq!(get_i64(&record, "empty"), None);
        assert_eq!(get_i64(&record, "missing"), None);
    }

    #[test]
    fn value_to_string_drops_quotes() {
        assert_eq!(value_to_string(&json!("main")), "main");
        assert_eq!(value_to_string(&json!(42)), "42");
    }

    #[test]
    fn trims_heads_prefix_only() {
        assert_eq!(trim_refs_heads("refs/heads/feature/x"), "feature/x");
        assert_eq!(trim_refs_heads("refs/tags/v1"), "refs/tags/v1");
        assert_eq!(trim_refs_heads("main"), "main");
    }
}
