//! MCP (Model Context Protocol) Server for n8n
//!
//! Exposes n8n workflows, executions and tags as MCP tools. Every call is
//! authorized against the configured environments, the caller's role and
//! a per-caller rate limit before anything reaches n8n.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        AI Assistant                              │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ MCP Protocol (JSON-RPC over stdio)
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 crates/n8n_gateway_mcp/                          │
//! │                                                                  │
//! │  Server       │ JSON-RPC stdio, tool dispatch, truncation        │
//! │  Gate         │ instance access → permission → rate limit        │
//! │  Tools        │ workflows, executions, tags                      │
//! │  Client       │ n8n REST API (X-N8N-API-KEY)                     │
//! │  Audit        │ optional NDJSON record of tool calls             │
//! │  Maintenance  │ limiter sweep, key-rotation reminder             │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                     n8n instances (/api/v1)
//! ```

pub mod audit;
pub mod client;
pub mod error;
pub mod gate;
pub mod maintenance;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;

// Re-exports for convenience
pub use audit::{AuditLog, AuditOutcome};
pub use client::{ApiMethod, ApiRequest, ApiTarget, HttpBackend, N8nBackend};
pub use error::{AuditError, ClientError, GateError, ToolError, GENERIC_ERROR_MESSAGE};
pub use gate::{Authorization, GateDecision, RequestGate};
pub use maintenance::Maintenance;
pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpProtocol, RequestId, ResponseOutcome,
};
pub use server::{McpServer, McpServerConfig};
pub use tools::{McpTool, ToolRegistry};
