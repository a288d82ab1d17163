//! n8n MCP gateway
//!
//! Usage:
//!   n8n-mcp [serve]                          # MCP server on stdio (default)
//!   n8n-mcp encrypt-config <path> [password] # Encrypt a plaintext config
//!
//! Environment:
//!   NODE_ENV=production          Production mode (anonymous callers, generic errors)
//!   CONFIG_ENCRYPTION_PASSWORD   Password for encrypted config files
//!   N8N_HOST / N8N_API_KEY       Single-instance fallback when no config file exists
//!   N8N_MCP_CONFIG               Explicit config file path
//!   DEBUG                        Debug-level logging

use clap::{Parser, Subcommand};
use n8n_gateway::cli::{self, encrypt_config::EncryptConfigArgs};
use n8n_gateway_config::Settings;
use n8n_gateway_logging::{init_logging, LogConfig};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "n8n-mcp", version, about = "MCP gateway for n8n workflow automation")]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server on stdin/stdout
    Serve,

    /// Encrypt a plaintext config file in place (keeps a .backup copy)
    EncryptConfig(EncryptConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => return cli::report_failure(&err.into()),
    };

    let command = cli.command.unwrap_or(Commands::Serve);
    let log_config = LogConfig {
        app_name: "n8n-mcp",
        verbose: cli.verbose || settings.debug,
        console_only: matches!(command, Commands::EncryptConfig(_)),
    };
    if let Err(err) = init_logging(log_config) {
        eprintln!("Warning: {:#}", err);
    }

    let result = match command {
        Commands::Serve => cli::serve::run(settings),
        Commands::EncryptConfig(args) => cli::encrypt_config::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => cli::report_failure(&err),
    }
}
