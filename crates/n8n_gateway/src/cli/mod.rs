//! CLI command implementations

pub mod encrypt_config;
pub mod serve;

use n8n_gateway_security::sanitize_message;
use std::process::ExitCode;

/// Print a failed command's error chain, scrubbed, and map it to exit code 1.
pub fn report_failure(err: &anyhow::Error) -> ExitCode {
    eprintln!("Error: {}", sanitize_message(&format!("{:#}", err)));
    ExitCode::from(1)
}
