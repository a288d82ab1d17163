use anyhow::{Context, Result};
use std::path::PathBuf;

/// Overrides the gateway home directory.
pub const HOME_ENV: &str = "N8N_MCP_HOME";

/// `$N8N_MCP_HOME`, else `~/.n8n-mcp`, else `./.n8n-mcp`.
pub fn gateway_home() -> PathBuf {
    match std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".n8n-mcp"),
    }
}

pub fn logs_dir() -> PathBuf {
    gateway_home().join("logs")
}

pub fn ensure_logs_dir() -> Result<PathBuf> {
    let dir = logs_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir)
}
