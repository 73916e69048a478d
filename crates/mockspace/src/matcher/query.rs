//! Query string matchers.

use super::format::format_params;
use super::MatchOutcome;
use crate::request::{group_pairs, parse_urlencoded, ProxiedRequest};
use serde_json::Value;
use std::collections::BTreeMap;

/// Normalize expected parameter values to their string form.
///
/// Scalars become a single value, arrays of scalars become repeated values.
/// Objects and nested arrays are rejected.
pub fn normalize_params(
    expected: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Vec<String>>, String> {
    expected
        .iter()
        .map(|(key, value)| {
            let values = match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| scalar_to_string(item).ok_or_else(|| invalid_value(key)))
                    .collect::<Result<Vec<_>, _>>()?,
                other => vec![scalar_to_string(other).ok_or_else(|| invalid_value(key))?],
            };
            Ok((key.clone(), values))
        })
        .collect()
}

fn invalid_value(key: &str) -> String {
    format!("parameter `{key}` must be a string, number, boolean or list of those")
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Compare request query parameters with the expected ones.
///
/// Non-strict matching ignores request parameters that are not expected.
pub fn match_query_params(
    request: &ProxiedRequest,
    expected: &BTreeMap<String, Value>,
    strict: bool,
) -> MatchOutcome {
    let expected = match normalize_params(expected) {
        Ok(expected) => expected,
        Err(e) => return MatchOutcome::fail(format!("Parameters do not match. {e}")),
    };

    let mut actual = request.query_params();
    if !strict {
        actual.retain(|key, _| expected.contains_key(key));
    }

    if actual == expected {
        MatchOutcome::pass()
    } else {
        MatchOutcome::fail(format!(
            "Parameters do not match. {} doesn't match {}",
            format_params(&actual),
            format_params(&expected)
        ))
    }
}

/// Compare the full query string, ignoring parameter order.
pub fn match_query_string(request: &ProxiedRequest, expected: &str) -> MatchOutcome {
    let expected = expected.trim_start_matches('?');
    let mut expected_pairs = parse_urlencoded(expected);
    let mut actual_pairs = parse_urlencoded(request.query.as_deref().unwrap_or(""));
    expected_pairs.sort();
    actual_pairs.sort();

    if actual_pairs == expected_pairs {
        MatchOutcome::pass()
    } else {
        MatchOutcome::fail(format!(
            "Query string doesn't match. {} doesn't match {}",
            format_params(&group_pairs(actual_pairs)),
            format_params(&group_pairs(expected_pairs))
        ))
    }
}
