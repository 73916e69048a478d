//! Rule registration handlers.

use crate::admin_api::types::*;
use crate::namespace::{NamespaceError, NamespaceRegistry, UpsertOutcome};
use crate::protocol::{NamespaceRef, RuleRequest, RulesResponse};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};

/// Which registration operation a rule body is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOp {
    Add,
    Replace,
    Remove,
    Upsert,
}

/// POST /{prefix}/{add|replace|remove|upsert}
pub async fn handle_rule_op(
    op: RuleOp,
    req: Request<Incoming>,
    registry: Arc<NamespaceRegistry>,
) -> Response<Full<Bytes>> {
    let request: RuleRequest = match parse_json_body(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match apply(op, request, &registry) {
        Ok(()) => empty_ok(),
        Err(e) => {
            warn!("{:?} rejected: {}", op, e);
            namespace_error_response(&e)
        }
    }
}

fn apply(op: RuleOp, request: RuleRequest, registry: &NamespaceRegistry) -> Result<(), NamespaceError> {
    let namespace = registry.get(&request.namespace_id)?;
    match op {
        RuleOp::Add => namespace.add(request.rule.into_rule()?),
        RuleOp::Replace => namespace.replace(request.rule.into_rule()?)?,
        RuleOp::Remove => {
            namespace.remove(&request.rule.into_selector()?);
        }
        RuleOp::Upsert => {
            let outcome = namespace.upsert(request.rule.into_rule()?);
            if outcome == UpsertOutcome::Added {
                debug!(namespace = %namespace.id(), "upsert found no rule to replace, added");
            }
        }
    }
    Ok(())
}

/// POST /{prefix}/rules - List registered rules with hit counts
pub async fn handle_rules(
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
            &RulesResponse {
                rules: namespace.rules(),
            },
        ),
        Err(e) => namespace_error_response(&e),
    }
}
