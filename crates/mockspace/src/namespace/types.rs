//! Error types for namespace operations.

/// Errors surfaced by registry, registration and call-accounting operations.
///
/// A request that matches no rule is not an error: it is answered with a
/// diagnostic response and recorded like any other call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    #[error("Invalid namespace_id: {0}")]
    NotFound(String),
    #[error("No rule registered for {method} {url}")]
    RuleNotFound { method: String, url: String },
    #[error("Invalid rule: {0}")]
    Validation(String),
    #[error("Not all requests have been executed: [{}]", .unmet.join(", "))]
    UnmetExpectations {
        namespace_id: String,
        unmet: Vec<String>,
    },
    #[error("Expected {expected} call(s) to {url}, got {actual}")]
    CallCountMismatch {
        url: String,
        expected: usize,
        actual: usize,
    },
}
