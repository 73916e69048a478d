//! Response templates registered with rules and the responses rendered from them.

use crate::request::WireBody;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Header set on diagnostic responses so callers can tell them apart from
/// a registered 500.
pub const NO_MATCH_HEADER: &str = "x-mockspace-match";

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Raw(Bytes),
    Json(Value),
}

/// The response half of a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseTemplate {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

impl Default for ResponseTemplate {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: None,
            headers: BTreeMap::new(),
            body: ResponseBody::Empty,
        }
    }
}

impl ResponseTemplate {
    /// Content type sent with the response: the explicit one, otherwise
    /// `application/json` for JSON bodies and `text/plain` for everything else.
    pub fn effective_content_type(&self) -> &str {
        match (&self.content_type, &self.body) {
            (Some(content_type), _) => content_type,
            (None, ResponseBody::Json(_)) => "application/json",
            (None, _) => "text/plain",
        }
    }

    pub fn render(&self) -> RenderedResponse {
        let body = match &self.body {
            ResponseBody::Empty => Bytes::new(),
            ResponseBody::Raw(bytes) => bytes.clone(),
            ResponseBody::Json(value) => Bytes::from(serde_json::to_vec(value).unwrap_or_default()),
        };

        let mut headers = Vec::with_capacity(self.headers.len() + 1);
        let overrides_content_type = self
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type"));
        if self.content_type.is_some() || !overrides_content_type {
            headers.push((
                "content-type".to_string(),
                self.effective_content_type().to_string(),
            ));
        }
        for (name, value) in &self.headers {
            if self.content_type.is_some() && name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            headers.push((name.clone(), value.clone()));
        }

        RenderedResponse {
            status: self.status,
            headers,
            body,
        }
    }
}

/// A concrete response ready to be written to the client and recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RenderedResponse {
    /// The 500 response returned when no rule matches.
    pub fn diagnostic(text: String) -> Self {
        Self {
            status: 500,
            headers: vec![
                (
                    "content-type".to_string(),
                    "text/plain; charset=utf-8".to_string(),
                ),
                (NO_MATCH_HEADER.to_string(), "none".to_string()),
            ],
            body: Bytes::from(text),
        }
    }

    pub fn summary(&self) -> ResponseSummary {
        ResponseSummary {
            status: self.status,
            headers: self.headers.iter().cloned().collect(),
            body: WireBody::from_non_empty(&self.body),
        }
    }
}

/// Recorded view of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSummary {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<WireBody>,
}

impl ResponseSummary {
    /// Parse the recorded body as JSON.
    pub fn json(&self) -> Option<Value> {
        match &self.body {
            Some(WireBody::Text(text)) => serde_json::from_str(text).ok(),
            _ => None,
        }
    }
}
