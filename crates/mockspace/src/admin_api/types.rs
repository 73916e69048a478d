//! Response helpers for the control API.

use crate::namespace::NamespaceError;
use crate::protocol::ErrorBody;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Extract the externally visible base URL from the `Host` header.
pub fn get_base_url(req: &Request<Incoming>, fallback: &str) -> String {
    if let Some(host) = req.headers().get("host") {
        if let Ok(host_str) = host.to_str() {
            return format!("http://{}", host_str);
        }
    }
    format!("http://{}", fallback)
}

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

/// `200 {}`
pub fn empty_ok() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({}))
}

/// Build an HTTP response with the given status and body.
pub fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

/// Build an HTTP response with headers.
///
/// Falls back to a bare 500 if a header name or value is invalid.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder.body(Full::new(body.into())).unwrap_or_else(|_| {
        build_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    })
}

/// Create an error response
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ErrorBody {
            detail: message.to_string(),
        },
    )
}

/// Map a namespace error to its HTTP status.
pub fn namespace_error_response(err: &NamespaceError) -> Response<Full<Bytes>> {
    let status = match err {
        NamespaceError::NotFound(_) | NamespaceError::RuleNotFound { .. } => StatusCode::NOT_FOUND,
        NamespaceError::Validation(_)
        | NamespaceError::UnmetExpectations { .. }
        | NamespaceError::CallCountMismatch { .. } => StatusCode::BAD_REQUEST,
    };
    error_response(status, &err.to_string())
}

/// Create a not found response
pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Collect request body into bytes
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    use http_body_util::BodyExt;
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}

/// Collect and decode a JSON request body. An empty body decodes as `{}`.
pub async fn parse_json_body<T: DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, Response<Full<Bytes>>> {
    let body = collect_body(req)
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &e))?;
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &body
    };
    serde_json::from_slice(body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &format!("Invalid request JSON: {e}")))
}
