//! Process settings, read once from the environment at startup.
//!
//! Everything that used to branch on environment variables at the call site
//! (`NODE_ENV`, `DEBUG`, the encryption password, the legacy host/key pair)
//! is captured here and handed to constructors.

use crate::error::{ConfigError, Result};
use n8n_gateway_security::AnonymousPolicy;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;

/// Fixed-window parameters applied to every tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window_ms: DEFAULT_RATE_LIMIT_WINDOW_MS,
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub is_production: bool,
    pub encryption_password: Option<String>,
    /// Legacy single-instance fallback (`N8N_HOST`).
    pub n8n_host: Option<String>,
    /// Legacy single-instance fallback (`N8N_API_KEY`).
    pub n8n_api_key: Option<String>,
    pub debug: bool,
    /// Candidate config files, searched in order.
    pub config_paths: Vec<PathBuf>,
    pub rate_limit: RateLimitSettings,
    pub anonymous_policy: AnonymousPolicy,
    pub audit_log: Option<PathBuf>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let is_production = non_empty("NODE_ENV")
            .map(|v| v.trim().eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let mut rate_limit = RateLimitSettings::default();
        if let Some(raw) = non_empty("N8N_MCP_RATE_LIMIT_MAX") {
            rate_limit.max_requests = parse_positive("N8N_MCP_RATE_LIMIT_MAX", &raw)?;
        }
        if let Some(raw) = non_empty("N8N_MCP_RATE_LIMIT_WINDOW_MS") {
            rate_limit.window_ms = parse_positive("N8N_MCP_RATE_LIMIT_WINDOW_MS", &raw)?;
        }

        let anonymous_policy = match non_empty("N8N_MCP_ANONYMOUS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidSetting {
                name: "N8N_MCP_ANONYMOUS",
                value: raw.clone(),
            })?,
            None => AnonymousPolicy::default(),
        };

        Ok(Self {
            is_production,
            encryption_password: lookup("CONFIG_ENCRYPTION_PASSWORD").filter(|v| !v.is_empty()),
            n8n_host: non_empty("N8N_HOST"),
            n8n_api_key: non_empty("N8N_API_KEY"),
            debug: flag_enabled(lookup("DEBUG").as_deref()),
            config_paths: candidate_paths(non_empty("N8N_MCP_CONFIG").map(PathBuf::from)),
            rate_limit,
            anonymous_policy,
            audit_log: non_empty("N8N_MCP_AUDIT_LOG").map(PathBuf::from),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            is_production: false,
            encryption_password: None,
            n8n_host: None,
            n8n_api_key: None,
            debug: false,
            config_paths: candidate_paths(None),
            rate_limit: RateLimitSettings::default(),
            anonymous_policy: AnonymousPolicy::default(),
            audit_log: None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Settings")
            .field("is_production", &self.is_production)
            .field("encryption_password", &redact(&self.encryption_password))
            .field("n8n_host", &self.n8n_host)
            .field("n8n_api_key", &redact(&self.n8n_api_key))
            .field("debug", &self.debug)
            .field("config_paths", &self.config_paths)
            .field("rate_limit", &self.rate_limit)
            .field("anonymous_policy", &self.anonymous_policy)
            .field("audit_log", &self.audit_log)
            .finish()
    }
}

/// `DEBUG` semantics: any non-empty value other than `0`/`false`/`no`/`off`.
pub fn flag_enabled(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) => !matches!(
            v.to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
    }
}

/// Config search order: explicit path, working directory, user config dir.
pub fn candidate_paths(explicit: Option<PathBuf>) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(4);
    paths.extend(explicit);
    paths.push(PathBuf::from(".config.json"));
    paths.push(PathBuf::from("config.json"));
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("n8n-mcp").join("config.json"));
    }
    paths
}

fn parse_positive<T>(name: &'static str, raw: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(ConfigError::InvalidSetting {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]).unwrap();
        assert!(!settings.is_production);
        assert!(!settings.debug);
        assert!(settings.encryption_password.is_none());
        assert_eq!(settings.rate_limit, RateLimitSettings::default());
        assert_eq!(settings.anonymous_policy, AnonymousPolicy::Trusted);
        assert_eq!(settings.config_paths[0], PathBuf::from(".config.json"));
        assert_eq!(settings.config_paths[1], PathBuf::from("config.json"));
    }

    #[test]
    fn test_production_and_overrides() {
        let settings = settings_from(&[
            ("NODE_ENV", "Production"),
            ("CONFIG_ENCRYPTION_PASSWORD", "hunter2hunter2"),
            ("N8N_MCP_CONFIG", "/etc/n8n-mcp.json"),
            ("N8N_MCP_RATE_LIMIT_MAX", "5"),
            ("N8N_MCP_RATE_LIMIT_WINDOW_MS", "1000"),
            ("N8N_MCP_ANONYMOUS", "deny"),
            ("N8N_MCP_AUDIT_LOG", "/tmp/audit.ndjson"),
            ("DEBUG", "1"),
        ])
        .unwrap();

        assert!(settings.is_production);
        assert!(settings.debug);
        assert_eq!(settings.encryption_password.as_deref(), Some("hunter2hunter2"));
        assert_eq!(settings.config_paths[0], PathBuf::from("/etc/n8n-mcp.json"));
        assert_eq!(settings.rate_limit.max_requests, 5);
        assert_eq!(settings.rate_limit.window_ms, 1000);
        assert_eq!(settings.anonymous_policy, AnonymousPolicy::Deny);
        assert_eq!(settings.audit_log, Some(PathBuf::from("/tmp/audit.ndjson")));
    }

    #[test]
    fn test_invalid_rate_limit_rejected() {
        assert!(matches!(
            settings_from(&[("N8N_MCP_RATE_LIMIT_MAX", "0")]),
            Err(ConfigError::InvalidSetting { .. })
        ));
        assert!(matches!(
            settings_from(&[("N8N_MCP_RATE_LIMIT_WINDOW_MS", "soon")]),
            Err(ConfigError::InvalidSetting { .. })
        ));
        assert!(matches!(
            settings_from(&[("N8N_MCP_ANONYMOUS", "maybe")]),
            Err(ConfigError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_flag_enabled() {
        assert!(!flag_enabled(None));
        assert!(!flag_enabled(Some("")));
        assert!(!flag_enabled(Some("false")));
        assert!(!flag_enabled(Some("0")));
        assert!(flag_enabled(Some("true")));
        assert!(flag_enabled(Some("n8n:*")));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let settings = settings_from(&[
            ("CONFIG_ENCRYPTION_PASSWORD", "hunter2hunter2"),
            ("N8N_API_KEY", "n8n_api_abcdefghijklmnop"),
        ])
        .unwrap();
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("abcdefghijklmnop"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
