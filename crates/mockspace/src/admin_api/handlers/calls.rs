//! Call history handlers.

use crate::admin_api::types::*;
use crate::namespace::NamespaceRegistry;
use crate::protocol::{
    AssertCallCountRequest, CallCountRequest, CallCountResponse, CallsResponse, NamespaceRef,
};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

/// POST /{prefix}/calls - Recorded calls in arrival order
pub async fn handle_calls(
    req: Request<Incoming>,
    registry: Arc<NamespaceRegistry>,
) -> Response<Full<Bytes>> {
    let target: NamespaceRef = match parse_json_body(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match registry.get(&target.namespace_id) {
        Ok(namespace) => json_response(
            StatusCode::OK,
            &CallsResponse {
                calls: namespace.calls(),
            },
        ),
        Err(e) => namespace_error_response(&e),
    }
}

/// POST /{prefix}/call_count - Number of calls to a literal URL
pub async fn handle_call_count(
    req: Request<Incoming>,
    registry: Arc<NamespaceRegistry>,
) -> Response<Full<Bytes>> {
    let request: CallCountRequest = match parse_json_body(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match registry.get(&request.namespace_id) {
        Ok(namespace) => json_response(
            StatusCode::OK,
            &CallCountResponse {
                call_count: namespace.call_count(&request.url),
            },
        ),
        Err(e) => namespace_error_response(&e),
    }
}

/// POST /{prefix}/assert_call_count - Fail unless the count is exact
pub async fn handle_assert_call_count(
    req: Request<Incoming>,
    registry: Arc<NamespaceRegistry>,
) -> Response<Full<Bytes>> {
    let request: AssertCallCountRequest = match parse_json_body(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let result = registry
        .get(&request.namespace_id)
        .and_then(|namespace| namespace.assert_call_count(&request.url, request.count));
    match result {
        Ok(call_count) => json_response(StatusCode::OK, &CallCountResponse { call_count }),
        Err(e) => namespace_error_response(&e),
    }
}
