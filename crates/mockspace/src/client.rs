//! Async client for the control protocol.
//!
//! ```no_run
//! # async fn demo() -> Result<(), mockspace::client::ClientError> {
//! use mockspace::client::{MockspaceClient, RuleSpec};
//!
//! let client = MockspaceClient::new("http://127.0.0.1:7564")?;
//! let ns = client.enter(false).await?;
//! ns.get(RuleSpec::new("/foo").json(serde_json::json!({"hey": "there"}))).await?;
//! // point the code under test at ns.base_url()
//! ns.exit().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::DEFAULT_CONTROL_PREFIX;
use crate::matcher::Matcher;
use crate::namespace::{CallRecord, RuleSnapshot};
use crate::protocol::{
    AssertCallCountRequest, CallCountRequest, CallCountResponse, CallsResponse, CheckResponse,
    EnterRequest, EnterResponse, ErrorBody, NamespaceRef, Operation, RuleRequest, RulesResponse,
};
use crate::request::WireBody;
use crate::rule::RulePayload;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to a mockspace server
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Server returned {status}: {detail}")]
    Server { status: u16, detail: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ClientError {
    /// HTTP status of a server-side rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Entry point: opens namespaces on one server.
#[derive(Debug, Clone)]
pub struct MockspaceClient {
    client: Client,
    base_url: String,
    control_prefix: String,
}

impl MockspaceClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            control_prefix: DEFAULT_CONTROL_PREFIX.to_string(),
        })
    }

    pub fn with_control_prefix(mut self, prefix: &str) -> Self {
        self.control_prefix = prefix.trim_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the underlying HTTP client
    pub fn http(&self) -> &Client {
        &self.client
    }

    pub async fn check(&self) -> Result<CheckResponse, ClientError> {
        self.call(Operation::Check, &serde_json::json!({})).await
    }

    /// Open a namespace. With `strict`, `exit` fails while any rule is unexercised.
    pub async fn enter(&self, strict: bool) -> Result<NamespaceClient, ClientError> {
        let entered: EnterResponse = self
            .call(Operation::Enter, &EnterRequest { strict: Some(strict) })
            .await?;
        Ok(NamespaceClient {
            client: self.clone(),
            namespace_id: entered.namespace_id,
            base_url: entered.base_url,
        })
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        op: Operation,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = format!("{}/{}/{}", self.base_url, self.control_prefix, op.as_str());
        let resp = self.client.post(&url).json(body).send().await?;
        if !resp.status().is_success() {
            return self.handle_error(resp).await;
        }
        resp.json::<T>()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn handle_error<T>(&self, resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        let detail = match resp.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => format!("Request failed with status {}", status),
        };
        Err(ClientError::Server {
            status: status.as_u16(),
            detail,
        })
    }
}

/// Handle on one open namespace.
#[derive(Debug, Clone)]
pub struct NamespaceClient {
    client: MockspaceClient,
    namespace_id: String,
    base_url: String,
}

impl NamespaceClient {
    pub fn id(&self) -> &str {
        &self.namespace_id
    }

    /// Absolute URL that routes into this namespace.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base_url` joined with a relative path such as `/foo?q=4`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn target(&self) -> NamespaceRef {
        NamespaceRef {
            namespace_id: self.namespace_id.clone(),
        }
    }

    async fn rule_op(&self, op: Operation, rule: RuleSpec) -> Result<(), ClientError> {
        let request = RuleRequest {
            namespace_id: self.namespace_id.clone(),
            rule: rule.into_payload(),
        };
        let _: Value = self.client.call(op, &request).await?;
        Ok(())
    }

    pub async fn add(&self, rule: RuleSpec) -> Result<(), ClientError> {
        self.rule_op(Operation::Add, rule).await
    }

    pub async fn replace(&self, rule: RuleSpec) -> Result<(), ClientError> {
        self.rule_op(Operation::Replace, rule).await
    }

    pub async fn upsert(&self, rule: RuleSpec) -> Result<(), ClientError> {
        self.rule_op(Operation::Upsert, rule).await
    }

    /// Remove every rule with the same method and URL. Response fields are ignored.
    pub async fn remove(&self, rule: RuleSpec) -> Result<(), ClientError> {
        self.rule_op(Operation::Remove, rule).await
    }

    pub async fn get(&self, rule: RuleSpec) -> Result<(), ClientError> {
        self.add(rule.method("GET")).await
    }

    pub async fn post(&self, rule: RuleSpec) -> Result<(), ClientError> {
        self.add(rule.method("POST")).await
    }

    pub async fn put(&self, rule: RuleSpec) -> Result<(), ClientError> {
        self.add(rule.method("PUT")).await
    }

    pub async fn patch(&self, rule: RuleSpec) -> Result<(), ClientError> {
        self.add(rule.method("PATCH")).await
    }

    pub async fn delete(&self, rule: RuleSpec) -> Result<(), ClientError> {
        self.add(rule.method("DELETE")).await
    }

    pub async fn head(&self, rule: RuleSpec) -> Result<(), ClientError> {
        self.add(rule.method("HEAD")).await
    }

    pub async fn options(&self, rule: RuleSpec) -> Result<(), ClientError> {
        self.add(rule.method("OPTIONS")).await
    }

    pub async fn reset(&self) -> Result<(), ClientError> {
        let _: Value = self.client.call(Operation::Reset, &self.target()).await?;
        Ok(())
    }

    pub async fn calls(&self) -> Result<Vec<CallRecord>, ClientError> {
        let resp: CallsResponse = self.client.call(Operation::Calls, &self.target()).await?;
        Ok(resp.calls)
    }

    pub async fn call_count(&self, url: &str) -> Result<usize, ClientError> {
        let request = CallCountRequest {
            namespace_id: self.namespace_id.clone(),
            url: url.to_string(),
        };
        let resp: CallCountResponse = self.client.call(Operation::CallCount, &request).await?;
        Ok(resp.call_count)
    }

    pub async fn assert_call_count(&self, url: &str, count: usize) -> Result<(), ClientError> {
        let request = AssertCallCountRequest {
            namespace_id: self.namespace_id.clone(),
            url: url.to_string(),
            count,
        };
        let _: CallCountResponse = self
            .client
            .call(Operation::AssertCallCount, &request)
            .await?;
        Ok(())
    }

    pub async fn rules(&self) -> Result<Vec<RuleSnapshot>, ClientError> {
        let resp: RulesResponse = self.client.call(Operation::Rules, &self.target()).await?;
        Ok(resp.rules)
    }

    /// Close the namespace. A strict namespace with unexercised rules stays open
    /// and the server's complaint is returned; the handle remains usable.
    pub async fn exit(&self) -> Result<(), ClientError> {
        let _: Value = self.client.call(Operation::Exit, &self.target()).await?;
        Ok(())
    }
}

/// Builder for a rule as sent over the wire.
#[derive(Debug, Clone, Default)]
pub struct RuleSpec {
    payload: RulePayload,
}

impl RuleSpec {
    /// Rule for an exact URL; the method defaults to GET.
    pub fn new(url: &str) -> Self {
        Self {
            payload: RulePayload {
                url: Some(url.to_string()),
                ..Default::default()
            },
        }
    }

    /// Rule for a regular-expression URL.
    pub fn pattern(source: &str) -> Self {
        Self {
            payload: RulePayload {
                pattern: Some(source.to_string()),
                dialect: Some("regex".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn method(mut self, method: &str) -> Self {
        self.payload.method = method.to_uppercase();
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.payload.status = Some(status);
        self
    }

    pub fn json(mut self, json: Value) -> Self {
        self.payload.json = Some(json);
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.payload.body = Some(WireBody::from(body));
        self
    }

    pub fn body_bytes(mut self, body: &[u8]) -> Self {
        self.payload.body = Some(WireBody::from_bytes(body));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.payload
            .headers
            .get_or_insert_with(Default::default)
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.payload.content_type = Some(content_type.to_string());
        self
    }

    pub fn matcher(mut self, matcher: Matcher) -> Self {
        self.payload
            .matchers
            .get_or_insert_with(Vec::new)
            .push(matcher);
        self
    }

    pub fn into_payload(self) -> RulePayload {
        self.payload
    }
}
