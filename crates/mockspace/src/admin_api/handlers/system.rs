//! System handlers: check, health.

use crate::admin_api::types::*;
use crate::matcher::{MATCHER_KINDS, VOCABULARY_VERSION};
use crate::namespace::NamespaceRegistry;
use crate::protocol::CheckResponse;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::sync::Arc;

/// POST /{prefix}/check - Liveness plus the matcher vocabulary
pub fn handle_check() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &CheckResponse {
            ok: true,
            version: VOCABULARY_VERSION,
            matcher_kinds: MATCHER_KINDS.iter().map(|k| k.to_string()).collect(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )
}

/// GET /health - Health check
pub fn handle_health(registry: Arc<NamespaceRegistry>) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &serde_json::json!({"status": "ok", "namespaces": registry.len()}),
    )
}
