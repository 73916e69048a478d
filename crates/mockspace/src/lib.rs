//! Mockspace: a namespaced HTTP mocking service.
//!
//! Test processes open a namespace over the control protocol, register rules,
//! point the code under test at the namespace's base URL and inspect the
//! recorded calls afterwards. Namespaces never see each other's rules or calls.

pub mod admin_api;
pub mod client;
pub mod config;
pub mod matcher;
pub mod namespace;
pub mod protocol;
pub mod request;
pub mod rule;
