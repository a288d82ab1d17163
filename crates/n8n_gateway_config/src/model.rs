//! Multi-instance configuration model and validation.
//!
//! Two persisted shapes are accepted and normalized at the boundary:
//!
//! - Multi: `{"environments": {name: {n8n_host, n8n_api_key}}, "defaultEnv": name}`
//! - Legacy: `{"n8n_host": .., "n8n_api_key": ..}`, loaded as one `"default"` environment
//!
//! Validation collects every violation before failing so a broken file can
//! be fixed in one pass.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Environment name used when a legacy config or env vars are loaded.
pub const LEGACY_ENVIRONMENT: &str = "default";
pub const MAX_ENVIRONMENTS: usize = 10;
pub const MAX_ENVIRONMENT_NAME_LEN: usize = 64;
pub const MIN_API_KEY_LEN: usize = 10;
pub const MAX_API_KEY_LEN: usize = 500;

/// n8n API key. Never rendered by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// One validated n8n instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct N8nInstance {
    host: String,
    api_key: ApiKey,
}

impl N8nInstance {
    /// Base URL without a trailing slash.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }
}

/// Validated configuration: at least one environment, default resolvable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiInstanceConfig {
    environments: BTreeMap<String, N8nInstance>,
    default_env: String,
}

impl MultiInstanceConfig {
    /// Decode and validate a JSON document in either accepted shape.
    pub fn from_value(value: Value) -> Result<Self> {
        ConfigShape::decode(value)?.validate()
    }

    /// Single `"default"` environment from a host/key pair.
    pub fn single(host: &str, api_key: &str) -> Result<Self> {
        ConfigShape::Legacy(RawInstance {
            n8n_host: Some(Value::String(host.to_string())),
            n8n_api_key: Some(Value::String(api_key.to_string())),
        })
        .validate()
    }

    pub fn default_env(&self) -> &str {
        &self.default_env
    }

    pub fn environment(&self, name: &str) -> Option<&N8nInstance> {
        self.environments.get(name)
    }

    pub fn default_instance(&self) -> Option<&N8nInstance> {
        self.environments.get(&self.default_env)
    }

    /// Environment names in sorted order.
    pub fn environment_names(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }

    pub fn environments(&self) -> impl Iterator<Item = (&str, &N8nInstance)> {
        self.environments.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Named environment, or the default when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<(&str, &N8nInstance)> {
        let name = name.unwrap_or(&self.default_env);
        self.environments
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                name: name.to_string(),
                available: self.environment_names(),
            })
    }
}

/// Undecoded environment entry. Field types are checked by
/// [`ConfigShape::validate`] so a wrong type is reported with everything else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInstance {
    #[serde(default)]
    pub n8n_host: Option<Value>,
    #[serde(default)]
    pub n8n_api_key: Option<Value>,
}

impl RawInstance {
    fn from_entry(entry: &serde_json::Map<String, Value>) -> Self {
        let field = |key: &str| entry.get(key).filter(|v| !v.is_null()).cloned();
        Self {
            n8n_host: field("n8n_host"),
            n8n_api_key: field("n8n_api_key"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMultiConfig {
    pub environments: Value,
    #[serde(rename = "defaultEnv", default)]
    pub default_env: Option<Value>,
}

/// Persisted config shape, decided by which top-level keys are present.
#[derive(Debug, Clone)]
pub enum ConfigShape {
    Multi(RawMultiConfig),
    Legacy(RawInstance),
}

impl ConfigShape {
    pub fn decode(value: Value) -> Result<Self> {
        let obj = value.as_object().ok_or(ConfigError::UnrecognizedShape)?;
        if obj.contains_key("environments") {
            let raw = serde_json::from_value(value)
                .map_err(|e| ConfigError::Invalid(vec![format!("environments: {}", e)]))?;
            Ok(ConfigShape::Multi(raw))
        } else if obj.contains_key("n8n_host") || obj.contains_key("n8n_api_key") {
            let raw = serde_json::from_value(value)
                .map_err(|e| ConfigError::Invalid(vec![format!("legacy config: {}", e)]))?;
            Ok(ConfigShape::Legacy(raw))
        } else {
            Err(ConfigError::UnrecognizedShape)
        }
    }

    /// Normalize to a [`MultiInstanceConfig`], reporting every violation.
    pub fn validate(self) -> Result<MultiInstanceConfig> {
        let mut violations = Vec::new();

        let (entries, default_env) = match self {
            ConfigShape::Multi(raw) => (
                environment_entries(raw.environments, &mut violations),
                raw.default_env,
            ),
            ConfigShape::Legacy(raw) => (
                Some(vec![(LEGACY_ENVIRONMENT.to_string(), raw)]),
                Some(Value::String(LEGACY_ENVIRONMENT.to_string())),
            ),
        };

        if let Some(entries) = &entries {
            if entries.is_empty() || entries.len() > MAX_ENVIRONMENTS {
                violations.push(format!(
                    "environments: expected 1-{} entries, found {}",
                    MAX_ENVIRONMENTS,
                    entries.len()
                ));
            }
        }

        let mut environments = BTreeMap::new();
        for (name, raw) in entries.iter().flatten() {
            if !valid_environment_name(name) {
                violations.push(format!(
                    "environments.{}: name must be 1-{} characters of [A-Za-z0-9_-]",
                    name, MAX_ENVIRONMENT_NAME_LEN
                ));
            }

            let host_path = format!("environments.{}.n8n_host", name);
            let host = string_field(&raw.n8n_host, &host_path, &mut violations).and_then(|h| {
                normalize_host(h)
                    .map_err(|reason| violations.push(format!("{}: {}", host_path, reason)))
                    .ok()
            });

            let key_path = format!("environments.{}.n8n_api_key", name);
            let api_key = string_field(&raw.n8n_api_key, &key_path, &mut violations).and_then(|k| {
                check_api_key(k)
                    .map(|()| ApiKey(k.to_string()))
                    .map_err(|reason| violations.push(format!("{}: {}", key_path, reason)))
                    .ok()
            });

            if let (Some(host), Some(api_key)) = (host, api_key) {
                environments.insert(name.clone(), N8nInstance { host, api_key });
            }
        }

        let default_env = match default_env {
            Some(Value::String(d)) if !d.trim().is_empty() => {
                let d = d.trim().to_string();
                // A named-but-broken environment is already reported above.
                let entry_prefix = format!("environments.{}.", d);
                let name_prefix = format!("environments.{}:", d);
                let already_reported = violations
                    .iter()
                    .any(|v| v.starts_with(&entry_prefix) || v.starts_with(&name_prefix));
                if entries.is_some() && !environments.contains_key(&d) && !already_reported {
                    violations.push(format!(
                        "defaultEnv: '{}' is not one of the configured environments",
                        d
                    ));
                }
                d
            }
            Some(Value::String(_)) | None => {
                violations.push("defaultEnv: required".to_string());
                String::new()
            }
            Some(_) => {
                violations.push("defaultEnv: must be a string".to_string());
                String::new()
            }
        };

        if !violations.is_empty() {
            return Err(ConfigError::Invalid(violations));
        }

        Ok(MultiInstanceConfig {
            environments,
            default_env,
        })
    }
}

/// Named entries of an `environments` object; `None` when it is not an object.
fn environment_entries(
    environments: Value,
    violations: &mut Vec<String>,
) -> Option<Vec<(String, RawInstance)>> {
    let Value::Object(map) = environments else {
        violations.push("environments: must be an object".to_string());
        return None;
    };

    let mut entries = Vec::with_capacity(map.len());
    for (name, entry) in map {
        match entry.as_object() {
            Some(fields) => entries.push((name, RawInstance::from_entry(fields))),
            None => violations.push(format!("environments.{}: must be an object", name)),
        }
    }
    Some(entries)
}

/// Trimmed string at `path`, or a recorded violation.
fn string_field<'a>(
    value: &'a Option<Value>,
    path: &str,
    violations: &mut Vec<String>,
) -> Option<&'a str> {
    match value {
        Some(Value::String(s)) => Some(s.trim()),
        Some(_) => {
            violations.push(format!("{}: must be a string", path));
            None
        }
        None => {
            violations.push(format!("{}: required", path));
            None
        }
    }
}

fn valid_environment_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_ENVIRONMENT_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn normalize_host(host: &str) -> std::result::Result<String, String> {
    let parsed = url::Url::parse(host).map_err(|e| format!("not a valid URL ({})", e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("scheme must be http or https, got {}", parsed.scheme()));
    }
    if parsed.host_str().is_none() {
        return Err("URL has no host".to_string());
    }
    Ok(host.trim_end_matches('/').to_string())
}

// Violations describe the key without ever echoing it.
fn check_api_key(key: &str) -> std::result::Result<(), String> {
    if key.len() < MIN_API_KEY_LEN || key.len() > MAX_API_KEY_LEN {
        return Err(format!(
            "must be {}-{} characters, got {}",
            MIN_API_KEY_LEN,
            MAX_API_KEY_LEN,
            key.len()
        ));
    }
    let allowed =
        |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '/' | '=');
    if !key.chars().all(allowed) {
        return Err("contains characters outside [A-Za-z0-9_.+/=-]".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY_A: &str = "n8n_api_aaaaaaaaaaaaaaaa";
    const KEY_B: &str = "n8n_api_bbbbbbbbbbbbbbbb";

    fn violations(err: ConfigError) -> Vec<String> {
        match err {
            ConfigError::Invalid(v) => v,
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_shape() {
        let config = MultiInstanceConfig::from_value(json!({
            "environments": {
                "prod": {"n8n_host": "https://n8n.example.com/", "n8n_api_key": KEY_A},
                "stage": {"n8n_host": "http://localhost:5678", "n8n_api_key": KEY_B}
            },
            "defaultEnv": "stage"
        }))
        .unwrap();

        assert_eq!(config.default_env(), "stage");
        assert_eq!(config.environment_names(), vec!["prod", "stage"]);
        assert_eq!(config.environment("prod").unwrap().host(), "https://n8n.example.com");
        assert_eq!(config.default_instance().unwrap().api_key().expose(), KEY_B);
    }

    #[test]
    fn test_legacy_shape_normalized() {
        let config = MultiInstanceConfig::from_value(json!({
            "n8n_host": "https://n8n.example.com",
            "n8n_api_key": KEY_A
        }))
        .unwrap();
        assert_eq!(config.default_env(), LEGACY_ENVIRONMENT);
        assert_eq!(config.environment_names(), vec![LEGACY_ENVIRONMENT]);
    }

    #[test]
    fn test_default_env_must_exist() {
        let err = MultiInstanceConfig::from_value(json!({
            "environments": {
                "prod": {"n8n_host": "https://n8n.example.com", "n8n_api_key": KEY_A}
            },
            "defaultEnv": "staging"
        }))
        .unwrap_err();
        let v = violations(err);
        assert_eq!(v.len(), 1);
        assert!(v[0].starts_with("defaultEnv"));
    }

    #[test]
    fn test_collects_all_violations() {
        let err = MultiInstanceConfig::from_value(json!({
            "environments": {
                "bad name": {"n8n_host": "ftp://n8n.example.com", "n8n_api_key": "short"},
                "prod": {"n8n_host": "https://n8n.example.com", "n8n_api_key": "has spaces in the key!"}
            }
        }))
        .unwrap_err();
        let v = violations(err);
        assert!(v.iter().any(|m| m.contains("bad name: name must be")));
        assert!(v.iter().any(|m| m.contains("n8n_host: scheme must be http or https")));
        assert!(v.iter().any(|m| m.contains("bad name.n8n_api_key: must be 10-500")));
        assert!(v.iter().any(|m| m.contains("prod.n8n_api_key: contains characters")));
        assert!(v.iter().any(|m| m == "defaultEnv: required"));
        assert_eq!(v.len(), 5);
    }

    #[test]
    fn test_type_errors_reported_with_other_violations() {
        let err = MultiInstanceConfig::from_value(json!({
            "environments": {
                "bad name": {"n8n_host": "ftp://x.example.com", "n8n_api_key": "short"},
                "prod": {"n8n_host": 5, "n8n_api_key": KEY_A},
                "stage": "https://stage.example.com"
            },
            "defaultEnv": "missing"
        }))
        .unwrap_err();
        let v = violations(err);
        assert!(v.iter().any(|m| m.contains("bad name: name must be")));
        assert!(v.iter().any(|m| m.contains("bad name.n8n_host: scheme must be http or https")));
        assert!(v.iter().any(|m| m.contains("bad name.n8n_api_key: must be 10-500")));
        assert!(v.contains(&"environments.prod.n8n_host: must be a string".to_string()));
        assert!(v.contains(&"environments.stage: must be an object".to_string()));
        assert!(v.iter().any(|m| m.starts_with("defaultEnv: 'missing'")));
        assert_eq!(v.len(), 6);
    }

    #[test]
    fn test_non_object_environments_and_default() {
        let err = MultiInstanceConfig::from_value(json!({
            "environments": ["prod"],
            "defaultEnv": 7
        }))
        .unwrap_err();
        let v = violations(err);
        assert_eq!(
            v,
            vec![
                "environments: must be an object".to_string(),
                "defaultEnv: must be a string".to_string()
            ]
        );
    }

    #[test]
    fn test_default_naming_badly_named_environment() {
        let err = MultiInstanceConfig::from_value(json!({
            "environments": {
                "bad name": {"n8n_host": "https://n8n.example.com", "n8n_api_key": KEY_A}
            },
            "defaultEnv": "bad name"
        }))
        .unwrap_err();
        let v = violations(err);
        assert_eq!(v.len(), 1);
        assert!(v[0].starts_with("environments.bad name: name must be"));
    }

    #[test]
    fn test_violations_never_echo_keys() {
        let secret = "sk-live-key with spaces 0123456789";
        let err = MultiInstanceConfig::from_value(json!({
            "environments": {"prod": {"n8n_host": "https://n8n.example.com", "n8n_api_key": secret}},
            "defaultEnv": "prod"
        }))
        .unwrap_err();
        assert!(!err.to_string().contains(secret));
    }

    #[test]
    fn test_environment_count_bounds() {
        let err = MultiInstanceConfig::from_value(json!({
            "environments": {},
            "defaultEnv": "prod"
        }))
        .unwrap_err();
        assert!(violations(err).iter().any(|m| m.contains("expected 1-10 entries, found 0")));

        let mut envs = serde_json::Map::new();
        for i in 0..11 {
            envs.insert(
                format!("env{}", i),
                json!({"n8n_host": "https://n8n.example.com", "n8n_api_key": KEY_A}),
            );
        }
        let err = MultiInstanceConfig::from_value(json!({
            "environments": envs,
            "defaultEnv": "env0"
        }))
        .unwrap_err();
        assert!(violations(err).iter().any(|m| m.contains("found 11")));
    }

    #[test]
    fn test_missing_fields_reported() {
        let err = MultiInstanceConfig::from_value(json!({
            "environments": {"prod": {}},
            "defaultEnv": "prod"
        }))
        .unwrap_err();
        let v = violations(err);
        assert!(v.contains(&"environments.prod.n8n_host: required".to_string()));
        assert!(v.contains(&"environments.prod.n8n_api_key: required".to_string()));
        // defaultEnv names a configured (if broken) environment: no extra violation.
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn test_unrecognized_shape() {
        assert!(matches!(
            MultiInstanceConfig::from_value(json!({"host": "x"})),
            Err(ConfigError::UnrecognizedShape)
        ));
        assert!(matches!(
            MultiInstanceConfig::from_value(json!([1, 2])),
            Err(ConfigError::UnrecognizedShape)
        ));
    }

    #[test]
    fn test_resolve() {
        let config = MultiInstanceConfig::single("https://n8n.example.com", KEY_A).unwrap();
        let (name, instance) = config.resolve(None).unwrap();
        assert_eq!(name, LEGACY_ENVIRONMENT);
        assert_eq!(instance.host(), "https://n8n.example.com");

        match config.resolve(Some("prod")) {
            Err(ConfigError::UnknownEnvironment { name, available }) => {
                assert_eq!(name, "prod");
                assert_eq!(available, vec![LEGACY_ENVIRONMENT]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_api_key_debug_redacted() {
        let config = MultiInstanceConfig::single("https://n8n.example.com", KEY_A).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(KEY_A));
        assert!(rendered.contains("ApiKey([REDACTED])"));
    }
}
