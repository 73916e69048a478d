//! Wire encoding of rules.
//!
//! `RulePayload` is exactly what clients send for `add`, `replace`, `remove`
//! and `upsert`. Conversion into a [`Rule`] is where every field is validated.

use super::response::{ResponseBody, ResponseTemplate};
use super::{PatternDialect, Rule, RuleSelector, UrlSpec};
use crate::matcher::Matcher;
use crate::namespace::NamespaceError;
use crate::request::WireBody;
use hyper::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePayload {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Regular-expression source text; mutually exclusive with `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    #[serde(default, alias = "content_type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<WireBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub matchers: Option<Vec<Matcher>>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Default for RulePayload {
    fn default() -> Self {
        Self {
            method: default_method(),
            url: None,
            pattern: None,
            dialect: None,
            content_type: None,
            headers: None,
            body: None,
            json: None,
            status: None,
            matchers: None,
        }
    }
}

impl RulePayload {
    /// Validate and convert into a rule.
    pub fn into_rule(self) -> Result<Rule, NamespaceError> {
        let method = parse_method(&self.method)?;
        let url = parse_url(self.url, self.pattern, self.dialect.as_deref())?;

        let body = match (self.body, self.json) {
            (Some(_), Some(_)) => {
                return Err(NamespaceError::Validation(
                    "`body` and `json` are mutually exclusive".to_string(),
                ))
            }
            (Some(body), None) => ResponseBody::Raw(
                body.to_bytes()
                    .map_err(|e| NamespaceError::Validation(format!("invalid base64 body: {e}")))?,
            ),
            (None, Some(json)) => ResponseBody::Json(json),
            (None, None) => ResponseBody::Empty,
        };

        let status = self.status.unwrap_or(200);
        if hyper::StatusCode::from_u16(status).is_err() {
            return Err(NamespaceError::Validation(format!(
                "invalid status code {status}"
            )));
        }

        let headers = self.headers.unwrap_or_default();
        for (name, value) in &headers {
            validate_header(name, value)?;
        }
        if let Some(content_type) = &self.content_type {
            validate_header("content-type", content_type)?;
        }

        let matchers = self.matchers.unwrap_or_default();
        for matcher in &matchers {
            matcher.validate().map_err(NamespaceError::Validation)?;
        }

        Ok(Rule {
            method,
            url,
            response: ResponseTemplate {
                status,
                content_type: self.content_type,
                headers,
                body,
            },
            matchers,
        })
    }

    /// Extract the method+url identity used by `remove`. Response fields are ignored.
    pub fn into_selector(self) -> Result<RuleSelector, NamespaceError> {
        Ok(RuleSelector {
            method: parse_method(&self.method)?,
            url: parse_url(self.url, self.pattern, self.dialect.as_deref())?,
        })
    }
}

impl From<&Rule> for RulePayload {
    fn from(rule: &Rule) -> Self {
        let (url, pattern, dialect) = match &rule.url {
            UrlSpec::Exact(url) => (Some(url.clone()), None, None),
            UrlSpec::Pattern { regex, dialect } => (
                None,
                Some(regex.as_str().to_string()),
                Some(dialect.as_str().to_string()),
            ),
        };
        let (body, json) = match &rule.response.body {
            ResponseBody::Empty => (None, None),
            ResponseBody::Raw(bytes) => (Some(WireBody::from_bytes(bytes)), None),
            ResponseBody::Json(value) => (None, Some(value.clone())),
        };
        RulePayload {
            method: rule.method.clone(),
            url,
            pattern,
            dialect,
            content_type: rule.response.content_type.clone(),
            headers: Some(rule.response.headers.clone()).filter(|h| !h.is_empty()),
            body,
            json,
            status: Some(rule.response.status),
            matchers: Some(rule.matchers.clone()).filter(|m| !m.is_empty()),
        }
    }
}

fn parse_method(method: &str) -> Result<String, NamespaceError> {
    let method = method.trim().to_uppercase();
    if method.is_empty() {
        return Err(NamespaceError::Validation("method must not be empty".to_string()));
    }
    hyper::Method::from_bytes(method.as_bytes())
        .map_err(|_| NamespaceError::Validation(format!("invalid HTTP method '{method}'")))?;
    Ok(method)
}

/// Response header names and values must be valid on the wire.
fn validate_header(name: &str, value: &str) -> Result<(), NamespaceError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| NamespaceError::Validation(format!("invalid header name '{name}'")))?;
    HeaderValue::from_str(value).map_err(|_| {
        NamespaceError::Validation(format!("invalid value for header '{name}'"))
    })?;
    Ok(())
}

fn parse_url(
    url: Option<String>,
    pattern: Option<String>,
    dialect: Option<&str>,
) -> Result<UrlSpec, NamespaceError> {
    match (url, pattern) {
        (Some(url), None) => {
            if url.is_empty() {
                return Err(NamespaceError::Validation("url must not be empty".to_string()));
            }
            Ok(UrlSpec::Exact(url))
        }
        (None, Some(pattern)) => {
            let dialect = match dialect {
                None => PatternDialect::default(),
                Some(name) => name.parse().map_err(NamespaceError::Validation)?,
            };
            UrlSpec::pattern(&pattern, dialect)
        }
        _ => Err(NamespaceError::Validation(
            "exactly one of `url` or `pattern` must be supplied".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> RulePayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_minimal_payload() {
        let rule = payload(json!({"url": "/foo", "json": {"hey": "there"}}))
            .into_rule()
            .unwrap();
        assert_eq!(rule.method, "GET");
        assert!(matches!(rule.url, UrlSpec::Exact(ref u) if u == "/foo"));
        assert_eq!(rule.response.status, 200);
        assert_eq!(rule.response.body, ResponseBody::Json(json!({"hey": "there"})));
        assert!(rule.matchers.is_empty());
    }

    #[test]
    fn test_explicit_nulls_are_accepted() {
        let rule = payload(json!({
            "method": "post",
            "url": "/foo",
            "pattern": null,
            "content_type": "text/html",
            "headers": null,
            "body": "hi",
            "json": null,
            "status": null,
            "match": null
        }))
        .into_rule()
        .unwrap();
        assert_eq!(rule.method, "POST");
        assert_eq!(rule.response.content_type.as_deref(), Some("text/html"));
        assert_eq!(rule.response.body, ResponseBody::Raw(bytes::Bytes::from("hi")));
    }

    #[test]
    fn test_pattern_payload() {
        let rule = payload(json!({"pattern": "/foo/.*", "dialect": "regex"}))
            .into_rule()
            .unwrap();
        assert!(rule.url.is_pattern());
        assert_eq!(rule.url.to_string(), "/foo/.*");
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            json!({"url": "/a", "pattern": "/b"}),
            json!({}),
            json!({"url": ""}),
            json!({"url": "/a", "body": "x", "json": {"a": 1}}),
            json!({"url": "/a", "status": 42}),
            json!({"url": "/a", "method": "NOT A METHOD"}),
            json!({"pattern": "(unclosed"}),
            json!({"pattern": "/a", "dialect": "glob"}),
            json!({"url": "/a", "body": {"base64": "***"}}),
            json!({"url": "/a", "match": [{"kind": "queryParams", "args": {"params": {"q": {"x": 1}}}}]}),
            json!({"url": "/a", "headers": {"bad header": "v"}}),
            json!({"url": "/a", "headers": {"x-id": "1\r\nx-injected: 2"}}),
            json!({"url": "/a", "contentType": "text/plain\n"}),
        ];
        for case in cases {
            let result = payload(case.clone()).into_rule();
            assert!(
                matches!(result, Err(NamespaceError::Validation(_))),
                "expected validation error for {case}"
            );
        }
    }

    #[test]
    fn test_selector_ignores_response_fields() {
        let selector = payload(json!({"method": "delete", "url": "/x", "json": {"a": 1}, "body": "b"}))
            .into_selector()
            .unwrap();
        assert_eq!(selector.method, "DELETE");
        assert_eq!(selector.url.to_string(), "/x");
    }

    #[test]
    fn test_payload_echo() {
        let original = json!({
            "method": "PUT",
            "pattern": "^/items/\\d+$",
            "dialect": "regex",
            "status": 204,
            "headers": {"x-id": "1"},
            "match": [{"kind": "headers", "args": {"headers": {"a": "b"}, "strict": false}}]
        });
        let rule = payload(original.clone()).into_rule().unwrap();
        let echoed = serde_json::to_value(RulePayload::from(&rule)).unwrap();
        assert_eq!(echoed, original);
    }
}
