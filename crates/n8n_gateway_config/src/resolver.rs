//! Configuration resolution: locate, decrypt, validate, cache.
//!
//! Resolution order:
//! 1. First existing file among [`Settings::config_paths`]
//! 2. Otherwise `N8N_HOST` / `N8N_API_KEY` as a single `"default"` environment
//!
//! The result is cached for the lifetime of the resolver. There is no reload.

use crate::crypto::{self, EncryptedConfigBlob};
use crate::error::{ConfigError, CryptoError, Result};
use crate::model::{MultiInstanceConfig, N8nInstance};
use crate::settings::Settings;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Config files larger than this are rejected unread.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Used for encrypted files outside production when no password is set.
pub const INSECURE_DEFAULT_PASSWORD: &str = "n8n-mcp-INSECURE-default-password";

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File { path: PathBuf, encrypted: bool },
    Environment,
    Provided,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::File { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: MultiInstanceConfig,
    pub source: ConfigSource,
}

/// Lazily loads and caches the multi-instance configuration.
#[derive(Debug)]
pub struct ConfigResolver {
    settings: Arc<Settings>,
    cache: OnceLock<LoadedConfig>,
}

impl ConfigResolver {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            cache: OnceLock::new(),
        }
    }

    /// Resolver pre-seeded with an already validated config.
    pub fn with_config(settings: Arc<Settings>, config: MultiInstanceConfig) -> Self {
        let cache = OnceLock::new();
        let _ = cache.set(LoadedConfig {
            config,
            source: ConfigSource::Provided,
        });
        Self { settings, cache }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load on first use; later calls return the cached value.
    ///
    /// Failures are not cached, so a fixed file is picked up on the next call.
    pub fn load(&self) -> Result<&LoadedConfig> {
        if let Some(loaded) = self.cache.get() {
            return Ok(loaded);
        }
        let loaded = load_config(&self.settings)?;
        Ok(self.cache.get_or_init(|| loaded))
    }

    pub fn config(&self) -> Result<&MultiInstanceConfig> {
        Ok(&self.load()?.config)
    }

    /// Named environment, or the default one when `name` is `None`.
    pub fn get_environment_config(&self, name: Option<&str>) -> Result<(&str, &N8nInstance)> {
        self.config()?.resolve(name)
    }

    pub fn available_instances(&self) -> Result<Vec<String>> {
        Ok(self.config()?.environment_names())
    }

    /// Source of the cached config, if loaded.
    pub fn source(&self) -> Option<&ConfigSource> {
        self.cache.get().map(|loaded| &loaded.source)
    }
}

/// Read and parse a config file, enforcing the size limit first.
pub fn read_config_file(path: &Path) -> Result<Value> {
    let metadata = fs::metadata(path).map_err(|e| ConfigError::io(path, e))?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }
    let bytes = fs::read(path).map_err(|e| ConfigError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| ConfigError::parse(path, e))
}

fn load_config(settings: &Settings) -> Result<LoadedConfig> {
    let found = settings.config_paths.iter().find(|p| p.is_file());

    let Some(path) = found else {
        debug!("No config file found; using N8N_HOST / N8N_API_KEY");
        let (Some(host), Some(api_key)) = (&settings.n8n_host, &settings.n8n_api_key) else {
            return Err(ConfigError::MissingEnvironment);
        };
        let config = MultiInstanceConfig::single(host, api_key)?;
        return Ok(LoadedConfig {
            config,
            source: ConfigSource::Environment,
        });
    };

    let mut document = read_config_file(path)?;
    let encrypted = crypto::looks_encrypted(&document);
    if encrypted {
        let blob: EncryptedConfigBlob =
            serde_json::from_value(document).map_err(|_| CryptoError::Decryption)?;
        let password = envelope_password(settings, path)?;
        document = crypto::decrypt(&blob, password)?;
    }

    let config = MultiInstanceConfig::from_value(document)?;
    info!(
        path = %path.display(),
        encrypted,
        environments = config.environment_names().len(),
        default_env = config.default_env(),
        "Loaded n8n configuration"
    );

    Ok(LoadedConfig {
        config,
        source: ConfigSource::File {
            path: path.clone(),
            encrypted,
        },
    })
}

fn envelope_password<'a>(settings: &'a Settings, path: &Path) -> Result<&'a str> {
    match settings.encryption_password.as_deref() {
        Some(password) => Ok(password),
        None if settings.is_production => Err(ConfigError::MissingPassword {
            path: path.to_path_buf(),
        }),
        None => {
            warn!(
                path = %path.display(),
                "!!! CONFIG_ENCRYPTION_PASSWORD is not set. Decrypting with the built-in INSECURE default password. Never do this outside local development. !!!"
            );
            Ok(INSECURE_DEFAULT_PASSWORD)
        }
    }
}
