//! Proxied request representation shared by matchers, the matching engine
//! and the call recorder.

use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A body as it travels over the wire.
///
/// UTF-8 payloads are plain JSON strings; anything else is wrapped as
/// `{"base64": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireBody {
    Text(String),
    Binary { base64: String },
}

impl WireBody {
    /// Encode raw bytes, preferring the text form when the bytes are valid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => WireBody::Text(text.to_string()),
            Err(_) => WireBody::Binary {
                base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        }
    }

    /// Encode raw bytes, returning `None` for an empty body.
    pub fn from_non_empty(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            None
        } else {
            Some(Self::from_bytes(bytes))
        }
    }

    /// Decode into raw bytes.
    pub fn to_bytes(&self) -> Result<Bytes, base64::DecodeError> {
        match self {
            WireBody::Text(text) => Ok(Bytes::from(text.clone())),
            WireBody::Binary { base64 } => base64::engine::general_purpose::STANDARD
                .decode(base64)
                .map(Bytes::from),
        }
    }
}

impl From<&str> for WireBody {
    fn from(text: &str) -> Self {
        WireBody::Text(text.to_string())
    }
}

/// An inbound request addressed to a namespace, with the namespace prefix
/// already stripped from the path.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxiedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ProxiedRequest {
    pub fn new(method: &str, path: &str, query: Option<&str>) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            method: method.to_uppercase(),
            path,
            query: query.filter(|q| !q.is_empty()).map(str::to_string),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Build a request from a relative URL such as `/foo?q=4`.
    pub fn from_url(method: &str, url: &str) -> Self {
        match url.split_once('?') {
            Some((path, query)) => Self::new(method, path, Some(query)),
            None => Self::new(method, url, None),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The literal URL used for call accounting: path plus `?query` when present.
    pub fn url(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Query parameters grouped by name, values in arrival order.
    pub fn query_params(&self) -> BTreeMap<String, Vec<String>> {
        group_pairs(parse_urlencoded(self.query.as_deref().unwrap_or("")))
    }

    /// First value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Headers keyed by lowercased name; repeated headers are joined with `, `.
    pub fn headers_map(&self) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &self.headers {
            map.entry(name.to_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.clone());
        }
        map
    }
}

/// Parse an `application/x-www-form-urlencoded` string into decoded pairs.
///
/// `+` decodes to a space; pairs without `=` get an empty value.
pub fn parse_urlencoded(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Group decoded pairs by key.
pub fn group_pairs(pairs: Vec<(String, String)>) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in pairs {
        grouped.entry(key).or_default().push(value);
    }
    grouped
}
