//! Error types for the MCP layer.
//!
//! Every error that can reach a client goes through
//! [`ToolError::client_message`], which sanitizes known errors and hides
//! unknown ones in production.

use n8n_gateway_config::ConfigError;
use n8n_gateway_security::{sanitize_message, AccessError};
use std::path::PathBuf;
use thiserror::Error;

/// Generic message shown for unexpected failures in production.
pub const GENERIC_ERROR_MESSAGE: &str = "An internal error occurred";

/// Authorization gate failures.
#[derive(Error, Debug)]
pub enum GateError {
    /// Configuration could not be loaded while resolving the instance list.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Access(#[from] AccessError),
}

/// n8n REST client failures.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid n8n URL: {0}")]
    InvalidUrl(String),

    #[error("n8n request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("n8n API returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// Audit log failures. Never surfaced to clients.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Failed to open audit log {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write audit entry: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to serialize audit entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Tool execution failures.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParam { name: &'static str, reason: String },

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            name,
            reason: reason.into(),
        }
    }

    /// JSON-RPC error code when surfaced as a protocol error.
    pub fn error_code(&self) -> i32 {
        match self {
            ToolError::UnknownTool(_) | ToolError::InvalidParam { .. } => -32602,
            ToolError::Serialization(_) => -32700,
            _ => -32603,
        }
    }

    /// Whether the error is an expected, describable outcome.
    ///
    /// Unknown errors are replaced by [`GENERIC_ERROR_MESSAGE`] in production.
    pub fn is_known(&self) -> bool {
        !matches!(
            self,
            ToolError::Io(_) | ToolError::Serialization(_) | ToolError::Client(ClientError::Http(_))
        )
    }

    /// Message safe to return to an MCP client.
    pub fn client_message(&self, production: bool) -> String {
        match self {
            ToolError::Gate(GateError::Access(err)) => err.client_message(),
            _ if production && !self.is_known() => GENERIC_ERROR_MESSAGE.to_string(),
            _ => sanitize_message(&self.to_string()),
        }
    }
}
