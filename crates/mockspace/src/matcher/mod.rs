//! Structured request matchers.
//!
//! A matcher is plain data: a `kind` drawn from a closed vocabulary plus typed
//! `args`. The server owns the only implementation of each kind, so clients in
//! any language can register matchers without shipping code.
//!
//! ```json
//! {"kind": "queryParams", "args": {"params": {"q": 4}, "strict": false}}
//! ```
//!
//! ## Module Structure
//!
//! - `query`: query parameter and query string matchers
//! - `headers`: header matcher
//! - `body`: JSON, form and raw body matchers
//! - `format`: rendering of values in mismatch descriptions

mod body;
mod format;
mod headers;
mod query;

use crate::request::{ProxiedRequest, WireBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub use format::{format_map, format_params, format_value};
pub use query::normalize_params;

/// Version of the matcher vocabulary understood by this server.
pub const VOCABULARY_VERSION: u32 = 1;

/// Every matcher kind in the current vocabulary, as spelled on the wire.
pub const MATCHER_KINDS: &[&str] = &[
    "queryParams",
    "queryString",
    "headers",
    "jsonBody",
    "formBody",
    "rawBody",
];

/// A single predicate over an incoming request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "args", rename_all = "camelCase")]
pub enum Matcher {
    /// Query parameters equal (`strict`) or contain the expected ones.
    QueryParams {
        params: BTreeMap<String, Value>,
        #[serde(default)]
        strict: bool,
    },
    /// Full query string, parameter order ignored.
    QueryString { query: String },
    /// Request headers equal (`strict`) or contain the expected ones.
    Headers {
        headers: BTreeMap<String, String>,
        #[serde(default)]
        strict: bool,
    },
    /// JSON body equals (`strict`) or recursively contains the expected value.
    JsonBody {
        json: Value,
        #[serde(default = "default_true")]
        strict: bool,
    },
    /// Form-encoded body equals the expected parameters.
    FormBody { params: BTreeMap<String, Value> },
    /// Body bytes equal the expected bytes.
    RawBody { body: WireBody },
}

fn default_true() -> bool {
    true
}

/// Result of evaluating one matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub passed: bool,
    /// Human-readable mismatch description; empty when the matcher passed.
    pub reason: String,
}

impl MatchOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: String::new(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
        }
    }
}

impl Matcher {
    /// Wire name of this matcher's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Matcher::QueryParams { .. } => "queryParams",
            Matcher::QueryString { .. } => "queryString",
            Matcher::Headers { .. } => "headers",
            Matcher::JsonBody { .. } => "jsonBody",
            Matcher::FormBody { .. } => "formBody",
            Matcher::RawBody { .. } => "rawBody",
        }
    }

    /// Check the arguments once at registration so evaluation never has to
    /// report malformed input.
    pub fn validate(&self) -> Result<(), String> {
        let result = match self {
            Matcher::QueryParams { params, .. } | Matcher::FormBody { params } => {
                normalize_params(params).map(|_| ())
            }
            Matcher::RawBody { body } => body
                .to_bytes()
                .map(|_| ())
                .map_err(|e| format!("invalid base64 body: {e}")),
            Matcher::QueryString { .. } | Matcher::Headers { .. } | Matcher::JsonBody { .. } => {
                Ok(())
            }
        };
        result.map_err(|e| format!("{} matcher: {e}", self.kind()))
    }

    /// Evaluate this matcher against a request.
    pub fn evaluate(&self, request: &ProxiedRequest) -> MatchOutcome {
        match self {
            Matcher::QueryParams { params, strict } => {
                query::match_query_params(request, params, *strict)
            }
            Matcher::QueryString { query } => query::match_query_string(request, query),
            Matcher::Headers { headers, strict } => {
                headers::match_headers(request, headers, *strict)
            }
            Matcher::JsonBody { json, strict } => body::match_json_body(request, json, *strict),
            Matcher::FormBody { params } => body::match_form_body(request, params),
            Matcher::RawBody { body } => body::match_raw_body(request, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_matcher_wire_format() {
        let matcher: Matcher = serde_json::from_value(json!({
            "kind": "queryParams",
            "args": {"params": {"q": 4}}
        }))
        .unwrap();
        assert_eq!(
            matcher,
            Matcher::QueryParams {
                params: BTreeMap::from([("q".to_string(), json!(4))]),
                strict: false,
            }
        );

        let serialized = serde_json::to_value(&matcher).unwrap();
        assert_eq!(serialized["kind"], "queryParams");
        assert_eq!(serialized["args"]["params"]["q"], 4);
    }

    #[test]
    fn test_json_body_defaults_to_strict() {
        let matcher: Matcher = serde_json::from_value(json!({
            "kind": "jsonBody",
            "args": {"json": {"a": 1}}
        }))
        .unwrap();
        assert!(matches!(matcher, Matcher::JsonBody { strict: true, .. }));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<Matcher, _> = serde_json::from_value(json!({
            "kind": "pickledClosure",
            "args": "gASVKAAAAAAAAAB9lC4="
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_kind_names_cover_vocabulary() {
        let samples = [
            Matcher::QueryParams { params: BTreeMap::new(), strict: false },
            Matcher::QueryString { query: String::new() },
            Matcher::Headers { headers: BTreeMap::new(), strict: false },
            Matcher::JsonBody { json: Value::Null, strict: true },
            Matcher::FormBody { params: BTreeMap::new() },
            Matcher::RawBody { body: WireBody::from("") },
        ];
        let kinds: Vec<&str> = samples.iter().map(Matcher::kind).collect();
        assert_eq!(kinds, MATCHER_KINDS);
        for sample in &samples {
            let wire = serde_json::to_value(sample).unwrap();
            assert_eq!(wire["kind"], sample.kind());
        }
    }

    #[test]
    fn test_validate() {
        let bad_params = Matcher::QueryParams {
            params: BTreeMap::from([("q".to_string(), json!({"nested": 1}))]),
            strict: false,
        };
        let err = bad_params.validate().unwrap_err();
        assert!(err.starts_with("queryParams matcher:"));

        let bad_body = Matcher::RawBody {
            body: WireBody::Binary { base64: "%%%".into() },
        };
        assert!(bad_body.validate().is_err());

        let ok = Matcher::Headers {
            headers: BTreeMap::from([("x".to_string(), "y".to_string())]),
            strict: true,
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_evaluate_dispatch() {
        let req = ProxiedRequest::from_url("GET", "/foo?q=4");
        let matcher = Matcher::QueryString { query: "q=4".into() };
        assert_eq!(matcher.evaluate(&req), MatchOutcome::pass());
    }
}
