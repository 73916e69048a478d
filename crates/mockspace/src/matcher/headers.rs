//! Header matcher.

use super::format::format_map;
use super::MatchOutcome;
use crate::request::ProxiedRequest;
use std::collections::BTreeMap;

/// Headers added by HTTP clients and the transport rather than by the caller.
/// Strict matching ignores them.
const TRANSPORT_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "connection",
    "transfer-encoding",
    "user-agent",
    "accept",
    "accept-encoding",
];

/// Compare request headers with the expected ones. Names are case-insensitive,
/// values are compared exactly.
pub fn match_headers(
    request: &ProxiedRequest,
    expected: &BTreeMap<String, String>,
    strict: bool,
) -> MatchOutcome {
    let expected: BTreeMap<String, String> = expected
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .collect();

    let mut actual = request.headers_map();
    if strict {
        actual.retain(|name, _| {
            expected.contains_key(name) || !TRANSPORT_HEADERS.contains(&name.as_str())
        });
    } else {
        actual.retain(|name, _| expected.contains_key(name));
    }

    if actual == expected {
        MatchOutcome::pass()
    } else {
        MatchOutcome::fail(format!(
            "Headers do not match: {} doesn't match {}",
            format_map(&actual),
            format_map(&expected)
        ))
    }
}
