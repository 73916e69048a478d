//! Core Namespace struct and implementation.

use super::calls::{CallLog, CallOutcome, CallRecord};
use super::engine::{find_match, MatchResult, RegisteredRule};
use super::types::NamespaceError;
use crate::config::UrlComparison;
use crate::request::ProxiedRequest;
use crate::rule::{RenderedResponse, Rule, RulePayload, RuleSelector};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Whether `upsert` replaced an existing rule or appended a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Replaced,
    Added,
}

/// A registered rule as reported by the `rules` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSnapshot {
    pub index: usize,
    pub hits: u64,
    #[serde(flatten)]
    pub rule: RulePayload,
}

#[derive(Debug, Default)]
struct NamespaceState {
    rules: Vec<RegisteredRule>,
    calls: CallLog,
}

/// An isolated set of rules and the calls made against them.
#[derive(Debug)]
pub struct Namespace {
    id: String,
    strict: bool,
    url_comparison: UrlComparison,
    created_at: DateTime<Utc>,
    /// Rules and calls share one lock so matching and recording are atomic.
    state: Mutex<NamespaceState>,
}

impl Namespace {
    pub fn new(id: String, strict: bool, url_comparison: UrlComparison) -> Self {
        Self {
            id,
            strict,
            url_comparison,
            created_at: Utc::now(),
            state: Mutex::new(NamespaceState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append a rule. Duplicates are allowed.
    pub fn add(&self, rule: Rule) {
        debug!(namespace = %self.id, "Adding rule {}", rule.describe());
        let registered = RegisteredRule::new(rule, self.url_comparison);
        self.state.lock().rules.push(registered);
    }

    /// Overwrite the first rule with the same method and URL.
    pub fn replace(&self, rule: Rule) -> Result<(), NamespaceError> {
        let mut state = self.state.lock();
        let selector = rule.selector();
        let slot = state
            .rules
            .iter_mut()
            .find(|registered| registered.rule.targets(&selector))
            .ok_or_else(|| NamespaceError::RuleNotFound {
                method: selector.method.clone(),
                url: selector.url.to_string(),
            })?;
        debug!(namespace = %self.id, "Replacing rule {}", selector);
        *slot = RegisteredRule::new(rule, self.url_comparison);
        Ok(())
    }

    /// Remove every rule matching the selector and return how many were removed.
    pub fn remove(&self, selector: &RuleSelector) -> usize {
        let mut state = self.state.lock();
        let before = state.rules.len();
        state
            .rules
            .retain(|registered| !registered.rule.targets(selector));
        let removed = before - state.rules.len();
        debug!(namespace = %self.id, "Removed {} rule(s) for {}", removed, selector);
        removed
    }

    /// Replace, or add when nothing matches. Atomic with respect to other operations.
    pub fn upsert(&self, rule: Rule) -> UpsertOutcome {
        let mut state = self.state.lock();
        let selector = rule.selector();
        let registered = RegisteredRule::new(rule, self.url_comparison);
        match state.rules.iter().position(|r| r.rule.targets(&selector)) {
            Some(index) => {
                debug!(namespace = %self.id, "Upsert replacing rule {}", selector);
                state.rules[index] = registered;
                UpsertOutcome::Replaced
            }
            None => {
                debug!(namespace = %self.id, "Upsert adding rule {}", selector);
                state.rules.push(registered);
                UpsertOutcome::Added
            }
        }
    }

    /// Drop all rules and recorded calls.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.rules.clear();
        state.calls.clear();
    }

    /// Match a request, record the call and return the response to send.
    pub fn handle(&self, request: &ProxiedRequest) -> RenderedResponse {
        let mut state = self.state.lock();
        match find_match(&state.rules, request, self.url_comparison) {
            MatchResult::Matched(index) => {
                let registered = &mut state.rules[index];
                registered.hits += 1;
                let response = registered.rule.response.render();
                debug!(
                    namespace = %self.id,
                    rule_index = index,
                    "{} {} matched {}",
                    request.method,
                    request.url(),
                    registered.rule.describe()
                );
                state.calls.append(
                    request,
                    CallOutcome::Matched {
                        rule_index: index,
                        response: response.summary(),
                    },
                );
                response
            }
            MatchResult::NoMatch(diagnostic) => {
                debug!(
                    namespace = %self.id,
                    "{} {} matched no rule",
                    request.method,
                    request.url()
                );
                state.calls.append(
                    request,
                    CallOutcome::NoMatch {
                        diagnostic: diagnostic.clone(),
                    },
                );
                RenderedResponse::diagnostic(diagnostic)
            }
        }
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.state.lock().calls.records().to_vec()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.state.lock().calls.count_url(url)
    }

    pub fn assert_call_count(&self, url: &str, expected: usize) -> Result<usize, NamespaceError> {
        let actual = self.call_count(url);
        if actual == expected {
            Ok(actual)
        } else {
            Err(NamespaceError::CallCountMismatch {
                url: url.to_string(),
                expected,
                actual,
            })
        }
    }

    pub fn rules(&self) -> Vec<RuleSnapshot> {
        self.state
            .lock()
            .rules
            .iter()
            .enumerate()
            .map(|(index, registered)| RuleSnapshot {
                index,
                hits: registered.hits,
                rule: RulePayload::from(&registered.rule),
            })
            .collect()
    }

    pub fn rule_count(&self) -> usize {
        self.state.lock().rules.len()
    }

    /// Rules that have never answered a call, as `METHOD url`.
    pub fn unmet_rules(&self) -> Vec<String> {
        self.state
            .lock()
            .rules
            .iter()
            .filter(|registered| registered.hits == 0)
            .map(|registered| registered.rule.describe())
            .collect()
    }
}
