//! Placeholder synthesis (§3, §4.10): unloaded indices return a record whose shape
//! matches a handful of already-loaded items rather than `null`, so templates that assume
//! a full record don't have to special-case the gap.

use serde_json::Value;

pub const MAX_SAMPLE_ITEMS: usize = 20;

/// Prefixed, stable id used for placeholder records so callers can recognize and skip
/// them (e.g. in selection or click handlers).
pub fn placeholder_id(index: usize) -> String {
    format!("__placeholder_{index}")
}

pub fn is_placeholder_id(id: &str) -> bool {
    id.starts_with("__placeholder_")
}

/// Merges the key shape of up to [`MAX_SAMPLE_ITEMS`] loaded items into one template
/// value, then replaces every leaf with a type-preserving mask. With no samples yet
/// (the common case for the very first render of a `withAsync` list) there's no shape
/// to mask, but the result is still an object carrying a recognizable placeholder id
/// rather than `null`.
pub fn synthesize(samples: &[Value], index: usize) -> Value {
    let template = merge_shape(samples);
    let mut placeholder = mask(&template);
    if !placeholder.is_object() {
        placeholder = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(map) = &mut placeholder {
        map.insert("id".to_string(), Value::String(placeholder_id(index)));
    }
    placeholder
}

fn merge_shape(samples: &[Value]) -> Value {
    let mut merged = Value::Null;
    for sample in samples.iter().take(MAX_SAMPLE_ITEMS) {
        merged = merge_into(merged, sample);
    }
    merged
}

fn merge_into(acc: Value, sample: &Value) -> Value {
    match (acc, sample) {
        (Value::Object(mut acc_map), Value::Object(sample_map)) => {
            for (k, v) in sample_map {
                acc_map
                    .entry(k.clone())
                    .and_modify(|existing| *existing = merge_into(existing.clone(), v))
                    .or_insert_with(|| v.clone());
            }
            Value::Object(acc_map)
        }
        (Value::Null, other) => other.clone(),
        (existing, _) => existing,
    }
}

fn mask(template: &Value) -> Value {
    match template {
        Value::String(s) => Value::String("█".repeat(s.chars().count().max(1))),
        Value::Number(_) => Value::from(0),
        Value::Bool(_) => Value::Bool(false),
        Value::Array(items) => Value::Array(items.iter().map(mask).collect()),
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), mask(v))).collect())
        }
        Value::Null => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_leaves_by_type() {
        let samples = vec![json!({"name": "Alice", "age": 30, "active": true})];
        let placeholder = synthesize(&samples, 5);
        assert_eq!(placeholder["name"], json!("█████"));
        assert_eq!(placeholder["age"], json!(0));
        assert_eq!(placeholder["active"], json!(false));
        assert_eq!(placeholder["id"], json!("__placeholder_5"));
    }

    #[test]
    fn merges_shape_across_samples_with_differing_keys() {
        let samples = vec![json!({"name": "Alice"}), json!({"name": "Bob", "age": 22})];
        let placeholder = synthesize(&samples, 0);
        assert!(placeholder.get("name").is_some());
        assert!(placeholder.get("age").is_some());
    }

    #[test]
    fn recurses_into_nested_structures() {
        let samples = vec![json!({"tags": ["a", "b"], "meta": {"views": 10}})];
        let placeholder = synthesize(&samples, 1);
        assert_eq!(placeholder["tags"][0], json!("█"));
        assert_eq!(placeholder["meta"]["views"], json!(0));
    }

    #[test]
    fn placeholder_ids_are_recognizable() {
        let id = placeholder_id(42);
        assert!(is_placeholder_id(&id));
        assert!(!is_placeholder_id("42"));
    }

    #[test]
    fn synthesizes_an_object_with_no_samples() {
        let placeholder = synthesize(&[], 7);
        assert!(placeholder.is_object());
        assert_eq!(placeholder["id"], json!("__placeholder_7"));
    }
}
