//! Integration tests for the control protocol.
//!
//! Each test starts an in-process server on an OS-assigned port and drives it
//! over real sockets with reqwest and the bundled client.

use assert_json_diff::assert_json_include;
use mockspace::admin_api::AdminApiServer;
use mockspace::client::{ClientError, MockspaceClient, RuleSpec};
use mockspace::config::UrlComparison;
use mockspace::matcher::Matcher;
use mockspace::namespace::{CallOutcome, NamespaceRegistry};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

const PREFIX: &str = "__mockspace__";

struct TestServer {
    base_url: String,
    registry: Arc<NamespaceRegistry>,
}

async fn start_server() -> TestServer {
    start_server_with(UrlComparison::Path).await
}

async fn start_server_with(comparison: UrlComparison) -> TestServer {
    let registry = Arc::new(NamespaceRegistry::new(comparison));
    let server = AdminApiServer::bind(
        "127.0.0.1:0".parse().unwrap(),
        PREFIX,
        Arc::clone(&registry),
    )
    .await
    .expect("Failed to bind test server");
    let base_url = format!("http://{}", server.local_addr());
    tokio::spawn(server.run());
    TestServer { base_url, registry }
}

impl TestServer {
    fn client(&self) -> MockspaceClient {
        MockspaceClient::new(&self.base_url).unwrap()
    }

    async fn control(&self, op: &str, body: Value) -> reqwest::Response {
        Client::new()
            .post(format!("{}/{}/{}", self.base_url, PREFIX, op))
            .json(&body)
            .send()
            .await
            .expect("control request failed")
    }
}

fn q4() -> Matcher {
    Matcher::QueryParams {
        params: [("q".to_string(), json!(4))].into_iter().collect(),
        strict: false,
    }
}

#[tokio::test]
async fn test_check_reports_vocabulary() {
    let server = start_server().await;
    let check = server.client().check().await.unwrap();
    assert!(check.ok);
    assert_eq!(check.version, 1);
    assert!(check.matcher_kinds.iter().any(|k| k == "queryParams"));
    assert!(check.matcher_kinds.iter().any(|k| k == "jsonBody"));
}

#[tokio::test]
async fn test_health() {
    let server = start_server().await;
    let resp = Client::new()
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_basic_round_trip() {
    let server = start_server().await;
    let ns = server.client().enter(false).await.unwrap();
    ns.get(RuleSpec::new("/foo").json(json!({"hey": "there"})))
        .await
        .unwrap();

    let resp = reqwest::get(ns.url("/foo")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/json"
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"hey": "there"}));
}

#[tokio::test]
async fn test_enter_returns_absolute_base_url() {
    let server = start_server().await;
    let resp = server.control("enter", json!({})).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let id = body["namespaceId"].as_str().unwrap();
    assert_eq!(body["basePath"], format!("/{id}"));
    assert_eq!(body["baseUrl"], format!("{}/{id}", server.base_url));
    assert!(server.registry.get(id).is_ok());
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let server = start_server().await;
    let client = server.client();
    let a = client.enter(false).await.unwrap();
    let b = client.enter(false).await.unwrap();
    assert_ne!(a.id(), b.id());

    a.get(RuleSpec::new("/foo").body("from a")).await.unwrap();

    let resp = reqwest::get(a.url("/foo")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "from a");

    let resp = reqwest::get(b.url("/foo")).await.unwrap();
    assert_eq!(resp.status(), 500);
    assert_eq!(resp.headers().get("x-mockspace-match").unwrap(), "none");

    assert_eq!(a.call_count("/foo").await.unwrap(), 1);
    assert_eq!(b.call_count("/foo").await.unwrap(), 1);
    assert_eq!(b.rules().await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_matcher_enforcement() {
    let server = start_server().await;
    let ns = server.client().enter(false).await.unwrap();
    ns.get(RuleSpec::new("/foo").json(json!({"ok": true})).matcher(q4()))
        .await
        .unwrap();

    let resp = reqwest::get(ns.url("/foo?q=4")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = reqwest::get(ns.url("/foo?q=5")).await.unwrap();
    assert_eq!(resp.status(), 500);
    let text = resp.text().await.unwrap();
    assert!(text.contains("doesn't match"), "diagnostic was: {text}");
    assert!(text.contains("- GET /foo?q=5"));
    assert!(text.contains("Parameters do not match. {q: 5} doesn't match {q: 4}"));
}

#[tokio::test]
async fn test_json_body_matcher_over_the_wire() {
    let server = start_server().await;
    let ns = server.client().enter(false).await.unwrap();
    ns.post(
        RuleSpec::new("/items")
            .status(201)
            .matcher(Matcher::JsonBody {
                json: json!({"name": "widget"}),
                strict: false,
            }),
    )
    .await
    .unwrap();

    let http = Client::new();
    let resp = http
        .post(ns.url("/items"))
        .json(&json!({"name": "widget", "qty": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = http
        .post(ns.url("/items"))
        .json(&json!({"name": "gadget"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn test_call_accounting() {
    let server = start_server().await;
    let ns = server.client().enter(false).await.unwrap();
    ns.get(RuleSpec::new("/foo").json(json!({}))).await.unwrap();

    reqwest::get(ns.url("/foo")).await.unwrap();
    reqwest::get(ns.url("/foo")).await.unwrap();

    assert_eq!(ns.call_count("/foo").await.unwrap(), 2);
    let calls = ns.calls().await.unwrap();
    assert_eq!(calls.len(), 2);
    assert_json_include!(
        actual: serde_json::to_value(&calls[1]).unwrap(),
        expected: json!({
            "index": 1,
            "outcome": "matched",
            "ruleIndex": 0,
            "request": {"method": "GET", "url": "/foo", "path": "/foo"},
            "response": {"status": 200, "body": "{}"}
        })
    );
    assert_eq!(calls[0].index, 0);
    assert_eq!(calls[1].index, 1);
    assert_eq!(calls[0].request.url, "/foo");
    match &calls[0].outcome {
        CallOutcome::Matched { rule_index, response } => {
            assert_eq!(*rule_index, 0);
            assert_eq!(response.status, 200);
            assert_eq!(response.json(), Some(json!({})));
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    ns.assert_call_count("/foo", 2).await.unwrap();
    let err = ns.assert_call_count("/foo", 3).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("Expected 3 call(s) to /foo, got 2"));
}

#[tokio::test]
async fn test_reset_clears_rules() {
    let server = start_server().await;
    let ns = server.client().enter(false).await.unwrap();
    ns.get(RuleSpec::new("/foo")).await.unwrap();
    assert_eq!(reqwest::get(ns.url("/foo")).await.unwrap().status(), 200);

    ns.reset().await.unwrap();
    assert!(ns.calls().await.unwrap().is_empty());
    assert_eq!(reqwest::get(ns.url("/foo")).await.unwrap().status(), 500);
}

#[tokio::test]
async fn test_replace_and_upsert() {
    let server = start_server().await;
    let ns = server.client().enter(false).await.unwrap();

    let err = ns
        .replace(RuleSpec::new("/foo").json(json!({"v": 1})))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));

    ns.upsert(RuleSpec::new("/foo").json(json!({"v": 1})))
        .await
        .unwrap();
    let body: Value = reqwest::get(ns.url("/foo")).await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({"v": 1}));

    ns.upsert(RuleSpec::new("/foo").json(json!({"v": 2})))
        .await
        .unwrap();
    ns.replace(RuleSpec::new("/foo").json(json!({"v": 3})))
        .await
        .unwrap();
    let rules = ns.rules().await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].hits, 0);
    assert_json_include!(
        actual: serde_json::to_value(&rules[0]).unwrap(),
        expected: json!({"index": 0, "hits": 0, "method": "GET", "url": "/foo", "json": {"v": 3}})
    );

    let body: Value = reqwest::get(ns.url("/foo")).await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({"v": 3}));
}

#[tokio::test]
async fn test_pattern_rule() {
    let server = start_server().await;
    let ns = server.client().enter(false).await.unwrap();
    ns.get(RuleSpec::pattern("/foo/.*").body("matched"))
        .await
        .unwrap();

    for path in ["/foo/bar", "/foo/baz"] {
        let resp = reqwest::get(ns.url(path)).await.unwrap();
        assert_eq!(resp.status(), 200, "{path}");
    }
    assert_eq!(reqwest::get(ns.url("/bar")).await.unwrap().status(), 500);
    assert_eq!(ns.rules().await.unwrap()[0].hits, 2);
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let server = start_server().await;
    let ns = server.client().enter(false).await.unwrap();
    ns.get(RuleSpec::new("/foo")).await.unwrap();

    ns.remove(RuleSpec::new("/foo")).await.unwrap();
    ns.remove(RuleSpec::new("/foo")).await.unwrap();
    assert!(ns.rules().await.unwrap().is_empty());
    assert_eq!(reqwest::get(ns.url("/foo")).await.unwrap().status(), 500);
}

#[tokio::test]
async fn test_strict_exit() {
    let server = start_server().await;
    let ns = server.client().enter(true).await.unwrap();
    ns.get(RuleSpec::new("/foo")).await.unwrap();

    let err = ns.exit().await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err
        .to_string()
        .contains("Not all requests have been executed"));
    assert!(server.registry.get(ns.id()).is_ok());

    reqwest::get(ns.url("/foo")).await.unwrap();
    ns.exit().await.unwrap();
    assert!(server.registry.get(ns.id()).is_err());
}

#[tokio::test]
async fn test_unknown_namespace_is_404() {
    let server = start_server().await;

    let resp = reqwest::get(format!("{}/does-not-exist/foo", server.base_url))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("does-not-exist"));

    let resp = server
        .control("reset", json!({"namespaceId": "does-not-exist"}))
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let server = start_server().await;
    let ns = server.client().enter(false).await.unwrap();

    let resp = server
        .control(
            "add",
            json!({"namespace_id": ns.id(), "url": "/a", "pattern": "/b"}),
        )
        .await;
    assert_eq!(resp.status(), 400);

    let resp = server
        .control(
            "add",
            json!({
                "namespaceId": ns.id(),
                "url": "/a",
                "match": [{"kind": "pickledClosure", "args": {}}]
            }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["detail"].is_string());

    let err = ns
        .add(RuleSpec::new("/foo").header("bad header", "v"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    let err = ns
        .add(RuleSpec::new("/foo").content_type("text/plain\r\nx-injected: 1"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(ns.rules().await.unwrap().is_empty());

    let resp = server.control("frobnicate", json!({})).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_raw_wire_protocol_round_trip() {
    let server = start_server().await;
    let resp = server.control("enter", json!({})).await;
    let entered: Value = resp.json().await.unwrap();
    let id = entered["namespaceId"].as_str().unwrap().to_string();

    let resp = server
        .control(
            "add",
            json!({
                "namespaceId": id,
                "method": "PUT",
                "url": "/thing",
                "status": 202,
                "content_type": "text/csv",
                "headers": {"x-thing": "1"},
                "body": "a,b"
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let resp = Client::new()
        .put(format!("{}/{}/thing", server.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    assert_eq!(resp.headers().get("content-type").unwrap(), "text/csv");
    assert_eq!(resp.headers().get("x-thing").unwrap(), "1");
    assert_eq!(resp.text().await.unwrap(), "a,b");

    let resp = server
        .control("call_count", json!({"namespaceId": id, "url": "/thing"}))
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"callCount": 1}));

    let resp = server.control("exit", json!({"namespaceId": id})).await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_path_and_query_comparison() {
    let server = start_server_with(UrlComparison::PathAndQuery).await;
    let ns = server.client().enter(false).await.unwrap();
    ns.get(RuleSpec::new("/foo?a=1")).await.unwrap();

    assert_eq!(reqwest::get(ns.url("/foo?a=1")).await.unwrap().status(), 200);
    assert_eq!(reqwest::get(ns.url("/foo?a=1&b=2")).await.unwrap().status(), 500);
}

#[tokio::test]
async fn test_client_error_variants() {
    let server = start_server().await;
    let ns = server.client().enter(false).await.unwrap();
    let err = ns.replace(RuleSpec::new("/missing")).await.unwrap_err();
    assert!(matches!(err, ClientError::Server { status: 404, .. }));
}

#[tokio::test]
async fn test_percent_encoded_path_matches_decoded_rule() {
    let server = start_server().await;
    let ns = server.client().enter(false).await.unwrap();
    ns.get(RuleSpec::new("/foo bar").json(json!({"ok": true})))
        .await
        .unwrap();

    let resp = reqwest::get(ns.url("/foo%20bar")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(ns.call_count("/foo bar").await.unwrap(), 1);
    assert_eq!(ns.calls().await.unwrap()[0].request.path, "/foo bar");
}
