//! n8n REST client.
//!
//! Tools describe calls as [`ApiRequest`] values; an [`N8nBackend`] sends
//! them to a resolved instance. The HTTP backend authenticates REST calls
//! with the `X-N8N-API-KEY` header under `/api/v1`. Webhook triggers go to
//! `/webhook/<path>` (or `/webhook-test/<path>`) without the API key.

use crate::error::ClientError;
use async_trait::async_trait;
use n8n_gateway_config::N8nInstance;
use n8n_gateway_security::sanitize_message;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const API_KEY_HEADER: &str = "X-N8N-API-KEY";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body echoed back from n8n.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl ApiMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMethod::Get => "GET",
            ApiMethod::Post => "POST",
            ApiMethod::Put => "PUT",
            ApiMethod::Delete => "DELETE",
        }
    }
}

/// What a request is addressed to on the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiTarget {
    /// Public REST API, relative to `/api/v1`.
    Rest(Vec<String>),
    /// Workflow webhook trigger.
    Webhook { path: String, test: bool },
}

/// A single call against an n8n instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub target: ApiTarget,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    /// REST request; `segments` are percent-encoded individually.
    pub fn rest(method: ApiMethod, segments: &[&str]) -> Self {
        Self {
            method,
            target: ApiTarget::Rest(segments.iter().map(|s| s.to_string()).collect()),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn webhook(method: ApiMethod, path: impl Into<String>, test: bool) -> Self {
        Self {
            method,
            target: ApiTarget::Webhook {
                path: path.into(),
                test,
            },
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Full URL for this request on `host`.
    pub fn url(&self, host: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(host).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidUrl("host cannot be a base URL".to_string()))?;
            segments.pop_if_empty();
            match &self.target {
                ApiTarget::Rest(parts) => {
                    segments.extend(["api", "v1"]);
                    segments.extend(parts);
                }
                ApiTarget::Webhook { path, test } => {
                    segments.push(if *test { "webhook-test" } else { "webhook" });
                    segments.extend(path.split('/').filter(|p| !p.is_empty()));
                }
            }
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }

    fn uses_api_key(&self) -> bool {
        matches!(self.target, ApiTarget::Rest(_))
    }
}

/// Sends [`ApiRequest`]s to an n8n instance.
#[async_trait]
pub trait N8nBackend: Send + Sync {
    async fn send(&self, instance: &N8nInstance, request: &ApiRequest)
        -> Result<Value, ClientError>;
}

/// reqwest-backed [`N8nBackend`].
pub struct HttpBackend {
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("n8n-mcp-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl N8nBackend for HttpBackend {
    async fn send(
        &self,
        instance: &N8nInstance,
        request: &ApiRequest,
    ) -> Result<Value, ClientError> {
        let url = request.url(instance.host())?;
        debug!(method = request.method.as_str(), path = url.path(), "n8n request");

        let mut builder = match request.method {
            ApiMethod::Get => self.http.get(url),
            ApiMethod::Post => self.http.post(url),
            ApiMethod::Put => self.http.put(url),
            ApiMethod::Delete => self.http.delete(url),
        };
        if request.uses_api_key() {
            builder = builder.header(API_KEY_HEADER, instance.api_key().expose());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        Ok(parse_body(&text))
    }
}

/// Successful body as JSON; empty bodies become `{"success": true}`.
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return json!({ "success": true });
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// n8n's `message` field if present, else the truncated body, sanitized.
fn error_message(text: &str) -> String {
    let message = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| text.chars().take(MAX_ERROR_BODY_CHARS).collect());
    sanitize_message(&message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_url() {
        let req =
            ApiRequest::rest(ApiMethod::Get, &["workflows", "abc"]).query("excludePinnedData", true);
        let url = req.url("https://n8n.example.com").unwrap();
        assert_eq!(
            url.as_str(),
            "https://n8n.example.com/api/v1/workflows/abc?excludePinnedData=true"
        );
    }

    #[test]
    fn test_rest_url_keeps_host_prefix() {
        let req = ApiRequest::rest(ApiMethod::Get, &["tags"]);
        let url = req.url("https://example.com/n8n/").unwrap();
        assert_eq!(url.as_str(), "https://example.com/n8n/api/v1/tags");
    }

    #[test]
    fn test_segments_are_escaped() {
        let req = ApiRequest::rest(ApiMethod::Delete, &["workflows", "../executions"]);
        let url = req.url("https://n8n.example.com").unwrap();
        assert!(url.path().starts_with("/api/v1/workflows/"));
        assert!(url.path().contains("%2F"));
    }

    #[test]
    fn test_webhook_url() {
        let live = ApiRequest::webhook(ApiMethod::Post, "/orders/new", false);
        assert_eq!(
            live.url("http://localhost:5678").unwrap().as_str(),
            "http://localhost:5678/webhook/orders/new"
        );
        assert!(!live.uses_api_key());

        let test = ApiRequest::webhook(ApiMethod::Get, "orders", true);
        assert_eq!(
            test.url("http://localhost:5678").unwrap().path(),
            "/webhook-test/orders"
        );
    }

    #[test]
    fn test_query_opt() {
        let req = ApiRequest::rest(ApiMethod::Get, &["executions"])
            .query_opt("workflowId", Some("w1"))
            .query_opt::<u32>("limit", None);
        assert_eq!(req.query, vec![("workflowId".to_string(), "w1".to_string())]);
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), json!({"success": true}));
        assert_eq!(parse_body("{\"id\":\"1\"}"), json!({"id": "1"}));
        assert_eq!(parse_body("Workflow was started"), json!("Workflow was started"));
    }

    #[test]
    fn test_error_message_prefers_n8n_message() {
        assert_eq!(
            error_message(r#"{"message":"not found","code":404}"#),
            "not found"
        );
        let long = "x ".repeat(1000);
        assert_eq!(error_message(&long).chars().count(), MAX_ERROR_BODY_CHARS);
        let scrubbed = error_message("key abcdefghijklmnopqrstuvwxyz rejected");
        assert!(!scrubbed.contains("abcdefghijklmnopqrstuvwxyz"));
    }
}
