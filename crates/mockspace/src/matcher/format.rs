//! Rendering of expected/actual values in mismatch descriptions.
//!
//! Maps render as `{k: v, k2: v2}` with keys sorted, lists as `[a, b]`,
//! strings without quotes.

use serde_json::Value;
use std::collections::BTreeMap;

/// Render a JSON value in the diagnostic notation.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let inner: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{k}: {}", format_value(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Render grouped parameters; single values are shown bare, repeated ones as a list.
pub fn format_params(params: &BTreeMap<String, Vec<String>>) -> String {
    let inner: Vec<String> = params
        .iter()
        .map(|(k, values)| match values.as_slice() {
            [single] => format!("{k}: {single}"),
            many => format!("{k}: [{}]", many.join(", ")),
        })
        .collect();
    format!("{{{}}}", inner.join(", "))
}

/// Render a flat string map.
pub fn format_map(map: &BTreeMap<String, String>) -> String {
    let inner: Vec<String> = map.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("{{{}}}", inner.join(", "))
}
