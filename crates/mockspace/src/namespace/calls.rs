//! Call recording.

use crate::request::{ProxiedRequest, WireBody};
use crate::rule::ResponseSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A proxied request as recorded, with the namespace prefix stripped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedRequest {
    pub method: String,
    /// Path plus `?query` when present.
    pub url: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<WireBody>,
}

impl From<&ProxiedRequest> for CapturedRequest {
    fn from(request: &ProxiedRequest) -> Self {
        Self {
            method: request.method.clone(),
            url: request.url(),
            path: request.path.clone(),
            query: request.query.clone(),
            headers: request.headers_map(),
            body: WireBody::from_non_empty(&request.body),
        }
    }
}

/// How a recorded call was answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CallOutcome {
    #[serde(rename_all = "camelCase")]
    Matched {
        rule_index: usize,
        response: ResponseSummary,
    },
    NoMatch { diagnostic: String },
}

impl CallOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, CallOutcome::Matched { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    /// Position in the namespace's call log, starting at 0.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub request: CapturedRequest,
    #[serde(flatten)]
    pub outcome: CallOutcome,
}

/// Append-only log of calls received by one namespace.
#[derive(Debug, Default)]
pub struct CallLog {
    records: Vec<CallRecord>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call and return its index.
    pub fn append(&mut self, request: &ProxiedRequest, outcome: CallOutcome) -> usize {
        let index = self.records.len();
        self.records.push(CallRecord {
            index,
            timestamp: Utc::now(),
            request: CapturedRequest::from(request),
            outcome,
        });
        index
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    /// Number of recorded calls whose literal URL equals `url`.
    pub fn count_url(&self, url: &str) -> usize {
        self.records
            .iter()
            .filter(|record| record.request.url == url)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
