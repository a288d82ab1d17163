//! Tracing setup for the n8n gateway binaries.
//!
//! Events go to stderr and, for the long-running server, to a size-capped
//! file under `<home>/logs`. Stdout is never written: it carries the MCP
//! JSON-RPC stream.

mod paths;
mod rotate;

pub use paths::{ensure_logs_dir, gateway_home, logs_dir, HOME_ENV};
pub use rotate::{LogFile, RotationPolicy};

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Overrides the computed filter when set (standard `EnvFilter` syntax).
pub const FILTER_ENV: &str = "N8N_MCP_LOG";

const GATEWAY_TARGETS: &[&str] = &[
    "n8n_gateway",
    "n8n_gateway_mcp",
    "n8n_gateway_config",
    "n8n_gateway_security",
];

pub struct LogConfig<'a> {
    /// File stem of the log file.
    pub app_name: &'a str,
    /// Debug level for gateway crates (`-v` or `DEBUG`).
    pub verbose: bool,
    /// Skip the log file (short-lived CLI commands).
    pub console_only: bool,
}

pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_filter(filter(config.verbose));

    let file_layer = if config.console_only {
        None
    } else {
        let dir = ensure_logs_dir()?;
        let file = LogFile::open(&dir, config.app_name, RotationPolicy::default())
            .with_context(|| format!("Failed to open log file in {}", dir.display()))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_filter(filter(config.verbose)),
        )
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(directives(verbose)))
}

fn directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    let mut parts = vec!["warn".to_string()];
    parts.extend(GATEWAY_TARGETS.iter().map(|t| format!("{}={}", t, level)));
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        let quiet = directives(false);
        assert!(quiet.starts_with("warn,"));
        assert!(quiet.contains("n8n_gateway_mcp=info"));
        assert!(!quiet.contains("debug"));

        let verbose = directives(true);
        assert_eq!(verbose.matches("=debug").count(), GATEWAY_TARGETS.len());
    }
}
