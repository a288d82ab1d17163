//! Error types for configuration loading, crypto and migration.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration result type.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Envelope encryption/decryption errors.
///
/// Decryption failures are deliberately a single variant: a wrong password,
/// a tampered tag and a malformed envelope are indistinguishable to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Failed to decrypt configuration")]
    Decryption,

    #[error("Failed to encrypt configuration")]
    Encryption,

    #[error("Iteration count {0} is outside the accepted range")]
    InvalidIterations(u32),
}

/// Configuration errors. All of these are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file {} is {size} bytes (limit {limit})", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Config file {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unrecognized config shape: expected `environments` + `defaultEnv` or `n8n_host` + `n8n_api_key`")]
    UnrecognizedShape,

    #[error("Invalid configuration: {}", join_violations(.0))]
    Invalid(Vec<String>),

    #[error("CONFIG_ENCRYPTION_PASSWORD is required to read encrypted config {} in production", .path.display())]
    MissingPassword { path: PathBuf },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("No config file found and N8N_HOST / N8N_API_KEY are not set")]
    MissingEnvironment,

    #[error("Environment '{name}' not found. Available: {}", .available.join(", "))]
    UnknownEnvironment { name: String, available: Vec<String> },

    #[error("Invalid value for {name}: {value}")]
    InvalidSetting { name: &'static str, value: String },
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}

fn join_violations(violations: &[String]) -> String {
    violations.join("; ")
}

/// Plaintext-to-envelope migration errors.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Config file {} is already encrypted", .path.display())]
    AlreadyEncrypted { path: PathBuf },

    #[error("No encryption password given and CONFIG_ENCRYPTION_PASSWORD is not set")]
    MissingPassword,

    #[error("Config file {} is not a JSON object", .path.display())]
    NotAnObject { path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MigrationError {
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
