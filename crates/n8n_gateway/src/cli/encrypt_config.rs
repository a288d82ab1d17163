//! `encrypt-config`: encrypt a plaintext config file in place.
//!
//! The original is kept next to it as `<path>.backup`.

use anyhow::{Context, Result};
use clap::Args;
use n8n_gateway_config::{migrate_config_file, MigrationError, MigrationReport};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct EncryptConfigArgs {
    /// Plaintext config file to encrypt
    pub path: PathBuf,

    /// Encryption password
    #[arg(env = "CONFIG_ENCRYPTION_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

pub fn run(args: EncryptConfigArgs) -> Result<()> {
    let report = encrypt(&args)?;
    print_report(&report);
    Ok(())
}

pub fn encrypt(args: &EncryptConfigArgs) -> Result<MigrationReport> {
    let password = args
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(MigrationError::MissingPassword)?;

    info!(path = %args.path.display(), "Encrypting configuration");
    let report = migrate_config_file(&args.path, password)
        .with_context(|| format!("Failed to encrypt {}", args.path.display()))?;
    info!(
        backup = %report.backup_path.display(),
        "Configuration encrypted"
    );
    Ok(report)
}

fn print_report(report: &MigrationReport) {
    println!(
        "Encrypted configuration written to {}",
        report.encrypted_path.display()
    );
    println!(
        "Plaintext backup saved to {}",
        report.backup_path.display()
    );
    println!("Delete the backup once the encrypted config has been verified.");
}
