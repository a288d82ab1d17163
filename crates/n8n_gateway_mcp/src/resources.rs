//! MCP resources.
//!
//! `n8n://environments` lists the configured environments with their hosts
//! and the default. API keys are never included.

use crate::protocol::{ResourceContents, ResourceDefinition};
use n8n_gateway_config::MultiInstanceConfig;
use serde::Serialize;

pub const ENVIRONMENTS_URI: &str = "n8n://environments";
const JSON_MIME: &str = "application/json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvironmentSummary<'a> {
    name: &'a str,
    host: &'a str,
    is_default: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvironmentsDocument<'a> {
    default_env: &'a str,
    environments: Vec<EnvironmentSummary<'a>>,
}

pub fn list_resources() -> Vec<ResourceDefinition> {
    vec![ResourceDefinition {
        uri: ENVIRONMENTS_URI.to_string(),
        name: "n8n environments".to_string(),
        description: "Configured n8n environments and the default environment".to_string(),
        mime_type: JSON_MIME.to_string(),
    }]
}

/// Contents of the environments resource.
pub fn environments_resource(
    config: &MultiInstanceConfig,
) -> Result<ResourceContents, serde_json::Error> {
    let default_env = config.default_env();
    let doc = EnvironmentsDocument {
        default_env,
        environments: config
            .environments()
            .map(|(name, instance)| EnvironmentSummary {
                name,
                host: instance.host(),
                is_default: name == default_env,
            })
            .collect(),
    };
    Ok(ResourceContents {
        uri: ENVIRONMENTS_URI.to_string(),
        mime_type: JSON_MIME.to_string(),
        text: serde_json::to_string_pretty(&doc)?,
    })
}
