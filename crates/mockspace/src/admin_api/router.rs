//! Route dispatch logic for the control API and proxied requests.

use crate::admin_api::handlers::rules::RuleOp;
use crate::admin_api::handlers::{calls, namespaces, rules, system};
use crate::admin_api::types::{error_response, get_base_url, namespace_error_response, not_found};
use crate::namespace::{handle_proxied_request, NamespaceRegistry};
use crate::protocol::Operation;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// State shared by every connection.
pub struct RouterState {
    pub registry: Arc<NamespaceRegistry>,
    pub control_prefix: String,
    /// Used for `baseUrl` when a request carries no `Host` header.
    pub local_addr: SocketAddr,
}

/// Parsed request target
#[derive(Debug, PartialEq, Eq)]
enum Route {
    /// GET /health
    Health,
    /// /{prefix}/{op}
    Control(Operation),
    /// /{prefix}/{unknown}
    UnknownControl(String),
    /// /{namespaceId}/{path...}; `path` keeps its leading slash
    Proxied { namespace_id: String, path: String },
    NotFound,
}

impl Route {
    fn parse(path: &str, control_prefix: &str) -> Self {
        let trimmed = path.trim_start_matches('/');
        if trimmed.is_empty() {
            return Route::NotFound;
        }
        let (first, rest) = match trimmed.split_once('/') {
            Some((first, rest)) => (first, Some(rest)),
            None => (trimmed, None),
        };

        if first == control_prefix {
            return match rest.map(|r| r.trim_end_matches('/')) {
                Some(op) if !op.is_empty() => match Operation::parse(op) {
                    Some(op) => Route::Control(op),
                    None => Route::UnknownControl(op.to_string()),
                },
                _ => Route::NotFound,
            };
        }
        if first == "health" && rest.is_none() {
            return Route::Health;
        }
        Route::Proxied {
            namespace_id: first.to_string(),
            path: format!("/{}", rest.unwrap_or("")),
        }
    }
}

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    state: Arc<RouterState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let route = Route::parse(req.uri().path(), &state.control_prefix);

    debug!("{} {} -> {:?}", method, req.uri(), route);

    let response = match route {
        Route::Health if method == Method::GET => system::handle_health(Arc::clone(&state.registry)),
        Route::Health => method_not_allowed(&method),
        Route::Control(op) if method == Method::POST => dispatch_control(op, req, &state).await,
        Route::Control(_) => method_not_allowed(&method),
        Route::UnknownControl(op) => {
            error_response(StatusCode::NOT_FOUND, &format!("Unknown operation: {op}"))
        }
        Route::Proxied { namespace_id, path } => match state.registry.get(&namespace_id) {
            Ok(namespace) => handle_proxied_request(req, namespace, &path).await,
            Err(e) => namespace_error_response(&e),
        },
        Route::NotFound => not_found(),
    };
    Ok(response)
}

async fn dispatch_control(
    op: Operation,
    req: Request<Incoming>,
    state: &RouterState,
) -> Response<Full<Bytes>> {
    let registry = Arc::clone(&state.registry);
    match op {
        Operation::Check => system::handle_check(),
        Operation::Enter => {
            let base_url = get_base_url(&req, &state.local_addr.to_string());
            namespaces::handle_enter(req, &base_url, registry).await
        }
        Operation::Exit => namespaces::handle_exit(req, registry).await,
        Operation::Reset => namespaces::handle_reset(req, registry).await,
        Operation::Add => rules::handle_rule_op(RuleOp::Add, req, registry).await,
        Operation::Replace => rules::handle_rule_op(RuleOp::Replace, req, registry).await,
        Operation::Remove => rules::handle_rule_op(RuleOp::Remove, req, registry).await,
        Operation::Upsert => rules::handle_rule_op(RuleOp::Upsert, req, registry).await,
        Operation::Rules => rules::handle_rules(req, registry).await,
        Operation::Calls => calls::handle_calls(req, registry).await,
        Operation::CallCount => calls::handle_call_count(req, registry).await,
        Operation::AssertCallCount => calls::handle_assert_call_count(req, registry).await,
    }
}

fn method_not_allowed(method: &Method) -> Response<Full<Bytes>> {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &format!("Method {method} not allowed"),
    )
}
