//! n8n MCP gateway launcher.
//!
//! Shared command implementations for the `n8n-mcp` and `encrypt-config`
//! binaries.

pub mod cli;
