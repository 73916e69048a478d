//! JSON messages of the control protocol, shared by the server and the client.
//!
//! Every control operation is `POST /{controlPrefix}/{op}` with one of these
//! bodies. Field names are camelCase; `namespace_id` is accepted as an alias.

use crate::namespace::{CallRecord, RuleSnapshot};
use crate::rule::RulePayload;
use serde::{Deserialize, Serialize};

/// Control operations, as spelled in the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Check,
    Enter,
    Exit,
    Add,
    Replace,
    Remove,
    Upsert,
    Reset,
    Calls,
    CallCount,
    AssertCallCount,
    Rules,
}

impl Operation {
    pub const ALL: &'static [Operation] = &[
        Operation::Check,
        Operation::Enter,
        Operation::Exit,
        Operation::Add,
        Operation::Replace,
        Operation::Remove,
        Operation::Upsert,
        Operation::Reset,
        Operation::Calls,
        Operation::CallCount,
        Operation::AssertCallCount,
        Operation::Rules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Check => "check",
            Operation::Enter => "enter",
            Operation::Exit => "exit",
            Operation::Add => "add",
            Operation::Replace => "replace",
            Operation::Remove => "remove",
            Operation::Upsert => "upsert",
            Operation::Reset => "reset",
            Operation::Calls => "calls",
            Operation::CallCount => "call_count",
            Operation::AssertCallCount => "assert_call_count",
            Operation::Rules => "rules",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_str() == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterRequest {
    /// Require every rule to be exercised before `exit` succeeds.
    #[serde(default, alias = "assert_all_requests_are_fired")]
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterResponse {
    pub namespace_id: String,
    /// Absolute URL callers should send mocked requests to.
    pub base_url: String,
    pub base_path: String,
}

/// Body of `exit`, `reset`, `calls` and `rules`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceRef {
    #[serde(alias = "namespace_id")]
    pub namespace_id: String,
}

/// Body of `add`, `replace`, `remove` and `upsert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRequest {
    #[serde(alias = "namespace_id")]
    pub namespace_id: String,
    #[serde(flatten)]
    pub rule: RulePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCountRequest {
    #[serde(alias = "namespace_id")]
    pub namespace_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertCallCountRequest {
    #[serde(alias = "namespace_id")]
    pub namespace_id: String,
    pub url: String,
    #[serde(alias = "expected")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallsResponse {
    pub calls: Vec<CallRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCountResponse {
    pub call_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesResponse {
    pub rules: Vec<RuleSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub ok: bool,
    /// Matcher vocabulary version.
    pub version: u32,
    pub matcher_kinds: Vec<String>,
    /// Server package version.
    #[serde(default)]
    pub server_version: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
