//! Body matchers: JSON, form-encoded and raw bytes.

use super::format::{format_params, format_value};
use super::query::normalize_params;
use super::MatchOutcome;
use crate::request::{group_pairs, parse_urlencoded, ProxiedRequest, WireBody};
use serde_json::Value;
use std::collections::BTreeMap;

/// Compare the JSON request body with `expected`.
///
/// Strict matching requires equality. Otherwise every key of every expected
/// object must be present in the actual body with a matching value; extra
/// keys are ignored. Arrays and scalars are always compared exactly.
pub fn match_json_body(request: &ProxiedRequest, expected: &Value, strict: bool) -> MatchOutcome {
    let actual: Value = if request.body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&request.body) {
            Ok(value) => value,
            Err(e) => {
                return MatchOutcome::fail(format!(
                    "request.body doesn't match: JSONDecodeError: Cannot parse request.body ({e})"
                ))
            }
        }
    };

    let compared = if strict {
        actual
    } else {
        project_onto(&actual, expected)
    };

    if &compared == expected {
        MatchOutcome::pass()
    } else {
        MatchOutcome::fail(format!(
            "request.body doesn't match: {} doesn't match {}",
            format_value(&compared),
            format_value(expected)
        ))
    }
}

/// Keep only the parts of `actual` that `expected` mentions, recursing into objects.
fn project_onto(actual: &Value, expected: &Value) -> Value {
    match (actual, expected) {
        (Value::Object(actual_map), Value::Object(expected_map)) => Value::Object(
            actual_map
                .iter()
                .filter_map(|(key, value)| {
                    expected_map
                        .get(key)
                        .map(|expected_value| (key.clone(), project_onto(value, expected_value)))
                })
                .collect(),
        ),
        _ => actual.clone(),
    }
}

/// Compare a form-encoded request body with the expected parameters.
pub fn match_form_body(
    request: &ProxiedRequest,
    expected: &BTreeMap<String, Value>,
) -> MatchOutcome {
    let expected = match normalize_params(expected) {
        Ok(expected) => expected,
        Err(e) => return MatchOutcome::fail(format!("request.body doesn't match: {e}")),
    };

    let body = String::from_utf8_lossy(&request.body);
    let actual = group_pairs(parse_urlencoded(&body));

    if actual == expected {
        MatchOutcome::pass()
    } else {
        MatchOutcome::fail(format!(
            "request.body doesn't match: {} doesn't match {}",
            format_params(&actual),
            format_params(&expected)
        ))
    }
}

/// Compare the raw request body byte-for-byte.
pub fn match_raw_body(request: &ProxiedRequest, expected: &WireBody) -> MatchOutcome {
    let expected = match expected.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => return MatchOutcome::fail(format!("request.body doesn't match: {e}")),
    };

    if request.body == expected {
        MatchOutcome::pass()
    } else {
        MatchOutcome::fail(format!(
            "request.body doesn't match: {} doesn't match {}",
            String::from_utf8_lossy(&request.body),
            String::from_utf8_lossy(&expected)
        ))
    }
}
