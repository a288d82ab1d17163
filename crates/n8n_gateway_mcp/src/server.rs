//! MCP Server Implementation
//!
//! JSON-RPC 2.0 server over stdio for the Model Context Protocol.
//!
//! # Architecture
//!
//! One request is handled at a time on a single-threaded runtime. A tool
//! call runs:
//!
//! 1. Argument shape check (`instance` only)
//! 2. [`RequestGate::authorize`]: instance, permission, rate limit
//! 3. Tool argument validation and request building
//! 4. The n8n call through the [`N8nBackend`]
//!
//! Failures after step 1 come back as `isError` tool results whose text
//! has passed [`ToolError::client_message`].
//!
//! # Example
//!
//! ```ignore
//! let mut server = McpServer::new(McpServerConfig::default(), resolver, limiter, backend)?;
//! server.run().await?;
//! ```

use crate::audit::{AuditLog, AuditOutcome, ToolCallRecord, UNRECOGNIZED_INSTANCE};
use crate::client::N8nBackend;
use crate::error::{GateError, ToolError};
use crate::gate::{GateDecision, RequestGate};
use crate::protocol::{
    methods, Incoming, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListChanged, McpProtocol, RequestId, ResourcesListResult,
    ResourcesReadParams, ResourcesReadResult, ServerCapabilities, ServerInfo, ToolsCallParams,
    ToolsCallResult, ToolsListResult, JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
};
use crate::resources::{self, ENVIRONMENTS_URI};
use crate::tools::{instance_arg, McpTool, ToolRegistry};
use anyhow::{Context, Result};
use n8n_gateway_config::ConfigResolver;
use n8n_gateway_security::{
    sanitize_args, Identity, OperationType, RateLimitDecision, RateLimiter, UserPermissions,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error, info, warn};

/// Default cap on a single tool result.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// MCP Server configuration
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Server name (reported in initialize)
    pub server_name: String,

    /// Server version (reported in initialize)
    pub server_version: String,

    /// Maximum tool result size in bytes
    pub max_response_bytes: usize,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            server_name: "n8n-mcp-gateway".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

/// Structured body returned when the rate limit is hit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitedBody {
    #[serde(flatten)]
    decision: RateLimitDecision,
    error: &'static str,
}

/// What an authorized tool call produced.
enum CallOutcome {
    Completed { instance: String, value: Value },
    RateLimited(RateLimitDecision),
}

/// MCP Server
pub struct McpServer {
    config: McpServerConfig,
    is_production: bool,
    gate: RequestGate,
    backend: Arc<dyn N8nBackend>,
    tools: ToolRegistry,
    audit: Option<AuditLog>,
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server. Opens the audit log if one is configured.
    pub fn new(
        config: McpServerConfig,
        resolver: Arc<ConfigResolver>,
        limiter: Arc<RateLimiter>,
        backend: Arc<dyn N8nBackend>,
    ) -> Result<Self> {
        let settings = resolver.settings();
        let is_production = settings.is_production;
        let audit = settings
            .audit_log
            .clone()
            .map(|path| {
                info!(path = %path.display(), "Audit log enabled");
                AuditLog::new(path)
            })
            .transpose()
            .context("Failed to open audit log")?;

        Ok(Self {
            config,
            is_production,
            gate: RequestGate::from_settings(limiter, resolver),
            backend,
            tools: ToolRegistry::new(),
            audit,
            initialized: false,
        })
    }

    /// Run the server on stdin/stdout until EOF.
    pub async fn run(&mut self) -> Result<()> {
        info!("MCP server starting");
        let mut protocol = McpProtocol::stdio();
        self.serve(&mut protocol).await?;
        info!("MCP server shutting down");
        Ok(())
    }

    /// Serve requests from any line-oriented transport until EOF.
    pub async fn serve<R, W>(&mut self, protocol: &mut McpProtocol<R, W>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while let Some(incoming) = protocol
            .read_message()
            .await
            .context("Failed to read from transport")?
        {
            let response = match incoming {
                Incoming::Request(request) => self.handle_request(request).await,
                Incoming::Malformed(reason) => Some(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::parse_error(format!("Invalid JSON-RPC message: {}", reason)),
                )),
            };
            if let Some(response) = response {
                protocol
                    .write_response(&response)
                    .await
                    .context("Failed to write response")?;
            }
        }
        Ok(())
    }

    /// Handle a single JSON-RPC message. Notifications get no response.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let notification = request.is_notification();
        let id = request.id.clone().unwrap_or_default();

        if request.jsonrpc != JSONRPC_VERSION {
            warn!("Rejected message with jsonrpc={:?}", request.jsonrpc);
            return (!notification).then(|| {
                JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(format!(
                        "Invalid JSON-RPC version: {}",
                        request.jsonrpc
                    )),
                )
            });
        }

        let result = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(request.params),
            methods::INITIALIZED => {
                debug!("Client confirmed initialization");
                Ok(json!({}))
            }
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST => to_result(ToolsListResult {
                tools: self.tools.list_tools(),
            }),
            methods::TOOLS_CALL => self.handle_tools_call(request.params).await,
            methods::RESOURCES_LIST => to_result(ResourcesListResult {
                resources: resources::list_resources(),
            }),
            methods::RESOURCES_READ => self.handle_resources_read(request.params),
            methods::PROMPTS_LIST => Ok(json!({ "prompts": [] })),
            other => Err(JsonRpcError::method_not_found(other)),
        };

        if notification {
            if let Err(err) = result {
                debug!(method = %request.method, "Notification failed: {}", err.message);
            }
            return None;
        }

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::error(id, err),
        })
    }

    /// Identity attached to requests on this transport.
    pub fn identity(&self) -> Identity {
        if self.is_production {
            Identity::Anonymous
        } else {
            Identity::Authenticated(UserPermissions::development_admin())
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn handle_initialize(&mut self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = parse_params(params, "initialize")?;

        info!(
            "Initialize from {} v{} (protocol {})",
            params.client_info.name, params.client_info.version, params.protocol_version
        );

        self.initialized = true;

        to_result(InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ListChanged {
                    list_changed: false,
                }),
                resources: Some(ListChanged {
                    list_changed: false,
                }),
                prompts: Some(ListChanged {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: self.config.server_name.clone(),
                version: self.config.server_version.clone(),
            },
        })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if !self.initialized {
            return Err(JsonRpcError::not_initialized());
        }

        let params: ToolsCallParams = parse_params(params, "tools/call")?;
        let tool = self.tools.get(&params.name).ok_or_else(|| {
            self.protocol_error(ToolError::UnknownTool(params.name.clone()))
        })?;
        if !(params.arguments.is_object() || params.arguments.is_null()) {
            return Err(JsonRpcError::invalid_params(
                "Tool arguments must be an object",
            ));
        }

        let logged_args = Value::Array(sanitize_args(std::slice::from_ref(&params.arguments)));
        info!(tool = tool.name(), args = %logged_args, "Tool call");

        let started = Instant::now();
        let outcome = self.execute_tool(tool, &params.arguments).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        self.audit_call(tool, &params.arguments, &outcome, duration_ms);

        let result = match outcome {
            Ok(CallOutcome::Completed { value, .. }) => self.render_value(&value),
            Ok(CallOutcome::RateLimited(decision)) => {
                let body = RateLimitedBody {
                    decision,
                    error: "Rate limit exceeded",
                };
                ToolsCallResult::error(serde_json::to_string(&body).map_err(internal)?)
            }
            Err(err) => {
                match &err {
                    // Already logged by the gate.
                    ToolError::Gate(GateError::Access(_)) => {}
                    other if other.is_known() => {
                        warn!(tool = tool.name(), "Tool failed: {}", other.client_message(false))
                    }
                    other => {
                        error!(tool = tool.name(), "Tool failed: {}", other.client_message(false))
                    }
                }
                ToolsCallResult::error(err.client_message(self.is_production))
            }
        };
        to_result(result)
    }

    /// Gate, build and send one tool call.
    async fn execute_tool(
        &self,
        tool: &dyn McpTool,
        args: &Value,
    ) -> Result<CallOutcome, ToolError> {
        let requested = instance_arg(args)?;
        let identity = self.identity();

        let auth = match self
            .gate
            .authorize(tool.operation(), requested, &identity)?
        {
            GateDecision::Allowed(auth) => auth,
            GateDecision::RateLimited(decision) => return Ok(CallOutcome::RateLimited(decision)),
        };

        let request = tool.prepare(args)?;
        let (instance, n8n) = self
            .gate
            .resolver()
            .get_environment_config(Some(auth.instance.as_str()))?;
        let value = self.backend.send(n8n, &request).await?;

        Ok(CallOutcome::Completed {
            instance: instance.to_string(),
            value,
        })
    }

    /// Successful result as pretty JSON, replaced by a notice when too large.
    fn render_value(&self, value: &Value) -> ToolsCallResult {
        let text = match value {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        };

        if text.len() <= self.config.max_response_bytes {
            return ToolsCallResult::text(text);
        }

        warn!(
            "Response truncated from {} to {} bytes",
            text.len(),
            self.config.max_response_bytes
        );
        let notice = json!({
            "truncated": true,
            "max_bytes": self.config.max_response_bytes,
            "original_bytes": text.len(),
            "message": "Response exceeded size limit. Use limit, cursor or filters to reduce output."
        });
        // Truncated responses are errors so the agent knows to paginate.
        ToolsCallResult::error(notice.to_string())
    }

    fn handle_resources_read(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: ResourcesReadParams = parse_params(params, "resources/read")?;
        if params.uri != ENVIRONMENTS_URI {
            return Err(JsonRpcError::invalid_params(format!(
                "Unknown resource: {}",
                params.uri
            )));
        }

        let identity = self.identity();
        let decision = self
            .gate
            .authorize(OperationType::ReadWorkflow, None, &identity)
            .map_err(|e| self.resource_error(e.into()))?;
        if let GateDecision::RateLimited(decision) = decision {
            return Err(JsonRpcError::internal_error("Rate limit exceeded")
                .with_data(json!(decision)));
        }

        let config = self
            .gate
            .resolver()
            .config()
            .map_err(|e| self.resource_error(e.into()))?;
        let contents = resources::environments_resource(config).map_err(internal)?;
        to_result(ResourcesReadResult {
            contents: vec![contents],
        })
    }

    fn resource_error(&self, err: ToolError) -> JsonRpcError {
        let message = err.client_message(self.is_production);
        match err {
            ToolError::Gate(GateError::Access(access)) => {
                JsonRpcError::invalid_request(message).with_data(access.client_payload())
            }
            other => JsonRpcError::with_code(other.error_code(), message),
        }
    }

    /// A tool error surfaced as a JSON-RPC error rather than a tool result.
    fn protocol_error(&self, err: ToolError) -> JsonRpcError {
        JsonRpcError::with_code(err.error_code(), err.client_message(self.is_production))
    }

    fn audit_call(
        &self,
        tool: &dyn McpTool,
        args: &Value,
        outcome: &Result<CallOutcome, ToolError>,
        duration_ms: u64,
    ) {
        let Some(audit) = &self.audit else {
            return;
        };

        let requested = instance_arg(args)
            .ok()
            .flatten()
            .map(|name| self.configured_or_unrecognized(name));
        let (instance, outcome) = match outcome {
            Ok(CallOutcome::Completed { instance, .. }) => {
                (Some(instance.as_str()), AuditOutcome::Success)
            }
            Ok(CallOutcome::RateLimited(_)) => (requested, AuditOutcome::RateLimited),
            Err(ToolError::Gate(_)) => (requested, AuditOutcome::Denied),
            Err(_) => (requested, AuditOutcome::Failed),
        };

        let record = ToolCallRecord {
            tool: tool.name(),
            instance,
            operation: Some(tool.operation()),
            outcome,
            duration_ms,
            args,
        };
        if let Err(err) = audit.record(&record) {
            warn!("Failed to write audit entry: {}", err);
        }
    }

    /// Caller-supplied instance names are only recorded when configured.
    fn configured_or_unrecognized<'a>(&self, name: &'a str) -> &'a str {
        let configured = self
            .gate
            .resolver()
            .config()
            .map(|config| config.environment(name).is_some())
            .unwrap_or(false);
        if configured {
            name
        } else {
            UNRECOGNIZED_INSTANCE
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
    method: &str,
) -> Result<T, JsonRpcError> {
    let params =
        params.ok_or_else(|| JsonRpcError::invalid_params(format!("Missing {} params", method)))?;
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid {} params: {}", method, e)))
}

fn to_result<T: Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(internal)
}

fn internal(err: serde_json::Error) -> JsonRpcError {
    error!("Failed to serialize response: {}", err);
    JsonRpcError::internal_error("Failed to serialize response")
}
