use serde_json::{Map, Value};

/// Rebuild a report document with every object's keys in sorted order.
/// Sequences keep their element order; ordering inside a sequence is
/// meaningful report content.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key.clone(), canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Stable pretty serialization of the canonical form. Two structurally equal
/// documents always produce the same string, so diffing is stable across
/// runs.
pub fn canonical_string(value: &Value) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&canonicalize(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonicalization_is_idempotent() {
        let doc = json!({"b": {"z": 1, "a": [3, 1, 2]}, "a": null});
        let once = canonicalize(&doc);
        let twice = canonicalize(&once);
        assert_eq!(once, twice);
        assert_eq!(
            canonical_string(&once).unwrap(),
            canonical_string(&twice).unwrap()
        );
    }

    #[test]
    fn object_keys_are_sorted_at_every_depth() {
        let doc = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let canonical = canonical_string(&doc).unwrap();
        let a = canonical.find("\"a\"").unwrap();
        let b = canonical.find("\"b\"").unwrap();
        let c = canonical.find("\"c\"").unwrap();
        let d = canonical.find("\"d\"").unwrap();
        assert!(a < b);
        assert!(c < d);
    }

    #[test]
    fn sequence_order_is_preserved() {
        let doc = json!({"files": [3, 1, 2]});
        let canonical = canonicalize(&doc);
        assert_eq!(canonical["files"], json!([3, 1, 2]));
    }
}
