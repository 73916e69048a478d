//! Request handling for calls proxied into a namespace.

use super::core::Namespace;
use crate::admin_api::types::{build_response_with_headers, error_response};
use crate::request::ProxiedRequest;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::warn;

/// Answer a request addressed to `/{namespaceId}{path}`.
///
/// `path` is the remainder after the namespace id, still percent-encoded, and
/// always starts with `/`. Rules are matched against the decoded form.
pub async fn handle_proxied_request(
    req: Request<Incoming>,
    namespace: Arc<Namespace>,
    path: &str,
) -> Response<Full<Bytes>> {
    let method = req.method().to_string();
    let query = req.uri().query().map(|q| q.to_string());
    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(namespace = %namespace.id(), "Failed to read request body: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read request body: {e}"),
            );
        }
    };

    let path = decode_path(path);
    let mut request = ProxiedRequest::new(&method, &path, query.as_deref()).with_body(body);
    request.headers = headers;

    let rendered = namespace.handle(&request);
    let status = StatusCode::from_u16(rendered.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    build_response_with_headers(status, rendered.headers, rendered.body)
}

/// Percent-decode a request path. Paths that do not decode to UTF-8 are kept as sent.
fn decode_path(path: &str) -> String {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => path.to_string(),
    }
}
