//! Rules: a request template plus the response to send when it matches.
//!
//! ## Module Structure
//!
//! - `response`: response templates and rendered responses
//! - `payload`: wire encoding and validation of rules

mod payload;
mod response;

pub use payload::RulePayload;
pub use response::{
    RenderedResponse, ResponseBody, ResponseSummary, ResponseTemplate, NO_MATCH_HEADER,
};

use crate::config::UrlComparison;
use crate::matcher::Matcher;
use crate::namespace::NamespaceError;
use crate::request::{group_pairs, parse_urlencoded, ProxiedRequest};
use bytes::Bytes;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Pattern syntax used by [`UrlSpec::Pattern`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PatternDialect {
    #[default]
    Regex,
}

impl PatternDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternDialect::Regex => "regex",
        }
    }
}

impl std::str::FromStr for PatternDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regex" => Ok(PatternDialect::Regex),
            other => Err(format!("unsupported pattern dialect '{other}'")),
        }
    }
}

/// URL side of a rule.
#[derive(Debug, Clone)]
pub enum UrlSpec {
    /// Literal URL, optionally carrying a query string.
    Exact(String),
    /// Regular expression searched for in the request path.
    Pattern {
        regex: Regex,
        dialect: PatternDialect,
    },
}

impl UrlSpec {
    pub fn exact(url: impl Into<String>) -> Self {
        UrlSpec::Exact(url.into())
    }

    pub fn pattern(source: &str, dialect: PatternDialect) -> Result<Self, NamespaceError> {
        let regex = Regex::new(source)
            .map_err(|e| NamespaceError::Validation(format!("invalid pattern: {e}")))?;
        Ok(UrlSpec::Pattern { regex, dialect })
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, UrlSpec::Pattern { .. })
    }

    /// Identity comparison: same literal URL, or same pattern source and dialect.
    pub fn same_target(&self, other: &UrlSpec) -> bool {
        match (self, other) {
            (UrlSpec::Exact(a), UrlSpec::Exact(b)) => a == b,
            (
                UrlSpec::Pattern { regex: a, dialect: da },
                UrlSpec::Pattern { regex: b, dialect: db },
            ) => a.as_str() == b.as_str() && da == db,
            _ => false,
        }
    }

    pub fn matches(&self, request: &ProxiedRequest, comparison: UrlComparison) -> bool {
        match (self, comparison) {
            (UrlSpec::Exact(url), UrlComparison::Path) => path_part(url) == request.path,
            (UrlSpec::Exact(url), UrlComparison::PathAndQuery) => *url == request.url(),
            (UrlSpec::Pattern { regex, .. }, UrlComparison::Path) => regex.is_match(&request.path),
            (UrlSpec::Pattern { regex, .. }, UrlComparison::PathAndQuery) => {
                regex.is_match(&request.url())
            }
        }
    }

    /// The query parameter matcher implied by a literal URL's query string
    /// when only paths are compared.
    pub fn implied_matcher(&self, comparison: UrlComparison) -> Option<Matcher> {
        let UrlSpec::Exact(url) = self else {
            return None;
        };
        if comparison != UrlComparison::Path {
            return None;
        }
        let (_, query) = url.split_once('?')?;
        if query.is_empty() {
            return None;
        }
        let params = group_pairs(parse_urlencoded(query))
            .into_iter()
            .map(|(key, mut values)| {
                let value = if values.len() == 1 {
                    Value::String(values.remove(0))
                } else {
                    Value::Array(values.into_iter().map(Value::String).collect())
                };
                (key, value)
            })
            .collect();
        Some(Matcher::QueryParams {
            params,
            strict: false,
        })
    }
}

impl fmt::Display for UrlSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlSpec::Exact(url) => f.write_str(url),
            UrlSpec::Pattern { regex, .. } => f.write_str(regex.as_str()),
        }
    }
}

fn path_part(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

/// Method+URL identity of a rule, used by `replace`, `remove` and `upsert`.
#[derive(Debug, Clone)]
pub struct RuleSelector {
    pub method: String,
    pub url: UrlSpec,
}

impl RuleSelector {
    pub fn new(method: &str, url: UrlSpec) -> Self {
        Self {
            method: method.to_uppercase(),
            url,
        }
    }
}

impl fmt::Display for RuleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A registered request template and its response.
#[derive(Debug, Clone)]
pub struct Rule {
    pub method: String,
    pub url: UrlSpec,
    pub response: ResponseTemplate,
    pub matchers: Vec<Matcher>,
}

impl Rule {
    pub fn new(method: &str, url: UrlSpec) -> Self {
        Self {
            method: method.to_uppercase(),
            url,
            response: ResponseTemplate::default(),
            matchers: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.response.status = status;
        self
    }

    pub fn with_json(mut self, json: Value) -> Self {
        self.response.body = ResponseBody::Json(json);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.response.body = ResponseBody::Raw(body.into());
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.response.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.response
            .headers
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn method_matches(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
    }

    pub fn selector(&self) -> RuleSelector {
        RuleSelector {
            method: self.method.clone(),
            url: self.url.clone(),
        }
    }

    /// Whether this rule has the identity described by `selector`.
    pub fn targets(&self, selector: &RuleSelector) -> bool {
        self.method_matches(&selector.method) && self.url.same_target(&selector.url)
    }

    /// Short `METHOD url` form used in diagnostics and errors.
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}
