//! Single-object-or-array normalization (§4.6 "Normalization"). Firmwares
//! disagree on whether a payload section is one object or an array of
//! them; every classifier goes through this before constructing a
//! `PushPayload`.

use meross_protocol::push::Entries;
use serde_json::Value;

pub fn normalize_entries(payload: &Value, key: &str) -> Entries {
    match payload.get(key) {
        Some(Value::Array(items)) => items.clone(),
        Some(obj @ Value::Object(_)) => vec![obj.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_object_becomes_one_entry() {
        let payload = serde_json::json!({"togglex": {"channel": 0, "onoff": 1}});
        let entries = normalize_entries(&payload, "togglex");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn array_passes_through() {
        let payload = serde_json::json!({"togglex": [{"channel": 0}, {"channel": 1}]});
        let entries = normalize_entries(&payload, "togglex");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn missing_key_is_empty() {
        let payload = serde_json::json!({});
        assert!(normalize_entries(&payload, "togglex").is_empty());
    }
}
