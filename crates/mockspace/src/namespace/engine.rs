//! Matching engine: selects the first rule that fully matches a request and
//! explains the failure when none does.

use crate::config::UrlComparison;
use crate::matcher::Matcher;
use crate::request::ProxiedRequest;
use crate::rule::Rule;

/// First line of every diagnostic response.
pub const NO_MATCH_HEADLINE: &str = "mockspace: the call doesn't match any registered rule.";

/// A rule as held by a namespace.
#[derive(Debug, Clone)]
pub struct RegisteredRule {
    pub rule: Rule,
    /// Query parameter matcher derived from the rule's literal URL.
    implied: Option<Matcher>,
    /// Number of calls this rule has answered.
    pub hits: u64,
}

impl RegisteredRule {
    pub fn new(rule: Rule, comparison: UrlComparison) -> Self {
        let implied = rule.url.implied_matcher(comparison);
        Self {
            rule,
            implied,
            hits: 0,
        }
    }

    /// Implied matcher first, then the explicit ones in registration order.
    pub fn matchers(&self) -> impl Iterator<Item = &Matcher> {
        self.implied.iter().chain(self.rule.matchers.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// Index of the selected rule.
    Matched(usize),
    /// Diagnostic text for the 500 response.
    NoMatch(String),
}

/// Find the first rule whose method, URL and matchers all accept `request`.
pub fn find_match(
    rules: &[RegisteredRule],
    request: &ProxiedRequest,
    comparison: UrlComparison,
) -> MatchResult {
    let mut failures: Vec<String> = Vec::new();
    let mut any_candidate = false;

    for (index, registered) in rules.iter().enumerate() {
        let rule = &registered.rule;
        if !rule.method_matches(&request.method) || !rule.url.matches(request, comparison) {
            continue;
        }
        any_candidate = true;

        let failed = registered
            .matchers()
            .map(|matcher| matcher.evaluate(request))
            .find(|outcome| !outcome.passed);
        match failed {
            None => return MatchResult::Matched(index),
            Some(outcome) => failures.push(format!("- {} {}", rule.describe(), outcome.reason)),
        }
    }

    let entries = if any_candidate {
        failures
    } else {
        non_candidate_entries(rules, request, comparison)
    };
    MatchResult::NoMatch(diagnostic(request, &entries))
}

fn non_candidate_entries(
    rules: &[RegisteredRule],
    request: &ProxiedRequest,
    comparison: UrlComparison,
) -> Vec<String> {
    if rules.is_empty() {
        return vec!["(no rules registered)".to_string()];
    }
    rules
        .iter()
        .map(|registered| {
            let rule = &registered.rule;
            let reason = if !rule.method_matches(&request.method) {
                "Method does not match"
            } else if !rule.url.matches(request, comparison) {
                "URL does not match"
            } else {
                "Matchers do not match"
            };
            format!("- {} {}", rule.describe(), reason)
        })
        .collect()
}

fn diagnostic(request: &ProxiedRequest, entries: &[String]) -> String {
    format!(
        "{NO_MATCH_HEADLINE}\n\nRequest: \n- {} {}\n\nAvailable matches:\n{}",
        request.method,
        request.url(),
        entries.join("\n")
    )
}
