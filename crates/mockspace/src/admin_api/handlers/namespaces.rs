//! Namespace lifecycle handlers: enter, exit, reset.

use crate::admin_api::types::*;
use crate::namespace::NamespaceRegistry;
use crate::protocol::{EnterRequest, EnterResponse, NamespaceRef};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::warn;

/// POST /{prefix}/enter - Create a namespace
pub async fn handle_enter(
    req: Request<Incoming>,
    base_url: &str,
    registry: Arc<NamespaceRegistry>,
) -> Response<Full<Bytes>> {
    let enter: EnterRequest = match parse_json_body(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let namespace = registry.create(enter.strict.unwrap_or(false));
    let base_path = format!("/{}", namespace.id());
    json_response(
        StatusCode::OK,
        &EnterResponse {
            namespace_id: namespace.id().to_string(),
            base_url: format!("{base_url}{base_path}"),
            base_path,
        },
    )
}

/// POST /{prefix}/exit - Destroy a namespace
pub async fn handle_exit(
    req: Request<Incoming>,
    registry: Arc<NamespaceRegistry>,
) -> Response<Full<Bytes>> {
    let target: NamespaceRef = match parse_json_body(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match registry.destroy(&target.namespace_id) {
        Ok(()) => empty_ok(),
        Err(e) => {
            warn!("exit rejected: {}", e);
            namespace_error_response(&e)
        }
    }
}

/// POST /{prefix}/reset - Clear rules and calls, keeping the namespace
pub async fn handle_reset(
    req: Request<Incoming>,
    registry: Arc<NamespaceRegistry>,
) -> Response<Full<Bytes>> {
    let target: NamespaceRef = match parse_json_body(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match registry.reset(&target.namespace_id) {
        Ok(()) => empty_ok(),
        Err(e) => namespace_error_response(&e),
    }
}
