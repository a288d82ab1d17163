//! `serve`: run the MCP server over stdio.

use anyhow::{Context, Result};
use n8n_gateway_config::{ConfigResolver, Settings};
use n8n_gateway_mcp::client::DEFAULT_TIMEOUT;
use n8n_gateway_mcp::{HttpBackend, Maintenance, McpServer, McpServerConfig};
use n8n_gateway_security::RateLimiter;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub fn run(settings: Settings) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    rt.block_on(serve(settings))
}

async fn serve(settings: Settings) -> Result<()> {
    if settings.is_production && settings.encryption_password.is_none() {
        warn!("CONFIG_ENCRYPTION_PASSWORD is not set; encrypted config files cannot be read");
    }

    let resolver = Arc::new(ConfigResolver::new(Arc::new(settings)));
    // Configuration problems are fatal before the first request.
    let loaded = resolver.load().context("Failed to load n8n configuration")?;
    info!(
        source = ?loaded.source,
        environments = ?loaded.config.environment_names(),
        default_env = loaded.config.default_env(),
        "Configuration ready"
    );
    let config_path = loaded.source.path().map(Path::to_path_buf);

    let limiter = Arc::new(RateLimiter::new());
    let backend =
        Arc::new(HttpBackend::new(DEFAULT_TIMEOUT).context("Failed to build HTTP client")?);
    let mut server =
        McpServer::new(McpServerConfig::default(), resolver, limiter.clone(), backend)?;

    let maintenance = Maintenance::start(limiter, config_path);
    let result = server.run().await;

    maintenance.shutdown().await;
    result
}
