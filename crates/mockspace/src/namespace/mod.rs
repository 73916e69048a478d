//! Namespaces: isolated rule sets and call logs addressed by an opaque id.
//!
//! This module provides:
//! - `NamespaceRegistry`: creation, lookup and destruction of namespaces
//! - `Namespace`: rules, hit counters and call log behind one lock
//! - `NamespaceError`: errors surfaced to the control API
//!
//! ## Module Structure
//!
//! - `types`: error type
//! - `calls`: call records and the per-namespace call log
//! - `engine`: first-match rule selection and diagnostics
//! - `core`: the Namespace struct
//! - `registry`: NamespaceRegistry
//! - `handler`: HTTP handling of proxied requests

mod calls;
mod core;
mod engine;
mod handler;
mod registry;
mod types;


pub use calls::{CallLog, CallOutcome, CallRecord, CapturedRequest};
pub use core::{Namespace, RuleSnapshot, UpsertOutcome};
pub use engine::{find_match, MatchResult, RegisteredRule, NO_MATCH_HEADLINE};
pub use handler::handle_proxied_request;
pub use registry::NamespaceRegistry;
pub use types::NamespaceError;
