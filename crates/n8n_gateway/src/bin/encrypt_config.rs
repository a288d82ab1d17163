//! Standalone config encryption tool.
//!
//! Usage: encrypt-config <path> [password]
//!
//! The password falls back to CONFIG_ENCRYPTION_PASSWORD.

use clap::Parser;
use n8n_gateway::cli::{self, encrypt_config::EncryptConfigArgs};
use n8n_gateway_config::flag_enabled;
use n8n_gateway_logging::{init_logging, LogConfig};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "encrypt-config",
    version,
    about = "Encrypt an n8n MCP config file in place"
)]
struct Cli {
    #[command(flatten)]
    args: EncryptConfigArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig {
        app_name: "encrypt-config",
        verbose: flag_enabled(std::env::var("DEBUG").ok().as_deref()),
        console_only: true,
    };
    if let Err(err) = init_logging(log_config) {
        eprintln!("Warning: {:#}", err);
    }

    match cli::encrypt_config::run(cli.args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => cli::report_failure(&err),
    }
}
