//! n8n Gateway Configuration
//!
//! - [`Settings`]: process environment, read once at startup
//! - [`crypto`]: PBKDF2 + AES-256-GCM config envelopes
//! - [`migrate`]: plaintext to envelope migration with backup
//! - [`ConfigResolver`]: locate, decrypt, validate and cache the
//!   multi-instance configuration

pub mod crypto;
pub mod error;
pub mod migrate;
pub mod model;
pub mod resolver;
pub mod settings;

pub use crypto::{decrypt, encrypt, is_encrypted, ConfigCrypto, EncryptedConfigBlob};
pub use error::{ConfigError, CryptoError, MigrationError, Result};
pub use migrate::{migrate_config_file, MigrationReport};
pub use model::{ApiKey, ConfigShape, MultiInstanceConfig, N8nInstance};
pub use resolver::{ConfigResolver, ConfigSource, LoadedConfig};
pub use settings::{flag_enabled, RateLimitSettings, Settings};
