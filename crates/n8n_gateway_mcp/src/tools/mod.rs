//! MCP Tool Implementations
//!
//! Each tool maps one MCP call onto one n8n REST request. Tools are pure
//! request builders: they validate arguments and return an [`ApiRequest`].
//! The server runs the authorization gate, resolves the instance and sends
//! the request through an [`N8nBackend`](crate::client::N8nBackend).
//!
//! # Tool Categories
//!
//! - **Workflows**: list, get, create, update, delete, activate, deactivate, execute
//! - **Executions**: list, get, delete
//! - **Tags**: list, create, update, delete
//!
//! Every tool accepts an optional `instance` argument naming the target
//! environment; it is injected into the schema by [`McpTool::definition`].

mod registry;

mod executions;
mod tags;
mod workflows;

pub use registry::ToolRegistry;

use crate::client::ApiRequest;
use crate::error::ToolError;
use crate::protocol::ToolDefinition;
use n8n_gateway_security::OperationType;
use serde_json::{json, Map, Value};

/// Argument naming the target environment.
pub const INSTANCE_ARG: &str = "instance";

/// Page size bounds accepted by the n8n list endpoints.
pub const MIN_LIMIT: u64 = 1;
pub const MAX_LIMIT: u64 = 250;

/// Trait for MCP tools
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "list_workflows")
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Operation checked by the authorization gate
    fn operation(&self) -> OperationType;

    /// JSON Schema for input parameters, without `instance`
    fn input_schema(&self) -> Value;

    /// Validate arguments and build the n8n request
    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError>;

    /// Get the tool definition for tools/list
    fn definition(&self) -> ToolDefinition {
        let mut schema = self.input_schema();
        if let Some(props) = schema
            .as_object_mut()
            .and_then(|s| s.entry("properties").or_insert_with(|| json!({})).as_object_mut())
        {
            props.insert(
                INSTANCE_ARG.to_string(),
                json!({
                    "type": "string",
                    "description": "Target n8n environment (defaults to the configured default)"
                }),
            );
        }
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: schema,
        }
    }
}

// =============================================================================
// Argument helpers
// =============================================================================

/// The `instance` argument, if the caller named one.
pub fn instance_arg(args: &Value) -> Result<Option<&str>, ToolError> {
    match args.get(INSTANCE_ARG) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.as_str())),
        Some(Value::String(_)) => Err(ToolError::invalid(INSTANCE_ARG, "must not be empty")),
        Some(_) => Err(ToolError::invalid(INSTANCE_ARG, "must be a string")),
    }
}

/// Required, non-empty string argument.
pub(crate) fn require_str<'a>(args: &'a Value, name: &'static str) -> Result<&'a str, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Err(ToolError::invalid(name, "is required")),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ToolError::invalid(name, "must not be empty"))
        }
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ToolError::invalid(name, "must be a string")),
    }
}

pub(crate) fn optional_str<'a>(
    args: &'a Value,
    name: &'static str,
) -> Result<Option<&'a str>, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ToolError::invalid(name, "must be a string")),
    }
}

pub(crate) fn optional_bool(args: &Value, name: &'static str) -> Result<Option<bool>, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ToolError::invalid(name, "must be a boolean")),
    }
}

/// Optional `limit`, bounded to [`MIN_LIMIT`]..=[`MAX_LIMIT`].
pub(crate) fn optional_limit(args: &Value) -> Result<Option<u64>, ToolError> {
    match args.get("limit") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_u64() {
            Some(n) if (MIN_LIMIT..=MAX_LIMIT).contains(&n) => Ok(Some(n)),
            _ => Err(ToolError::invalid(
                "limit",
                format!("must be an integer between {} and {}", MIN_LIMIT, MAX_LIMIT),
            )),
        },
    }
}

/// Optional string restricted to a fixed set of values.
pub(crate) fn optional_choice<'a>(
    args: &'a Value,
    name: &'static str,
    choices: &[&str],
) -> Result<Option<&'a str>, ToolError> {
    match optional_str(args, name)? {
        Some(v) if !choices.contains(&v) => Err(ToolError::invalid(
            name,
            format!("must be one of: {}", choices.join(", ")),
        )),
        other => Ok(other),
    }
}

/// Workflow body for create/update.
///
/// Must be an object with a non-empty `name` and a `nodes` array.
/// `connections` and `settings` default to empty objects; other fields
/// are dropped since the n8n API rejects read-only properties.
pub(crate) fn workflow_body(args: &Value) -> Result<Value, ToolError> {
    let workflow = match args.get("workflow") {
        Some(Value::Object(w)) => w,
        None | Some(Value::Null) => return Err(ToolError::invalid("workflow", "is required")),
        Some(_) => return Err(ToolError::invalid("workflow", "must be an object")),
    };

    let name = match workflow.get("name") {
        Some(Value::String(n)) if !n.trim().is_empty() => n.clone(),
        _ => return Err(ToolError::invalid("workflow", "'name' must be a non-empty string")),
    };
    let nodes = match workflow.get("nodes") {
        Some(Value::Array(nodes)) => nodes.clone(),
        _ => return Err(ToolError::invalid("workflow", "'nodes' must be an array")),
    };

    let mut body = Map::new();
    body.insert("name".to_string(), Value::String(name));
    body.insert("nodes".to_string(), Value::Array(nodes));
    for key in ["connections", "settings"] {
        let value = match workflow.get(key) {
            None | Some(Value::Null) => json!({}),
            Some(v @ Value::Object(_)) => v.clone(),
            Some(_) => {
                return Err(ToolError::invalid(
                    "workflow",
                    format!("'{}' must be an object", key),
                ))
            }
        };
        body.insert(key.to_string(), value);
    }
    if let Some(static_data) = workflow.get("staticData").filter(|v| !v.is_null()) {
        body.insert("staticData".to_string(), static_data.clone());
    }
    Ok(Value::Object(body))
}

/// Shared `limit`/`cursor` pagination properties.
fn pagination_schema() -> Value {
    json!({
        "limit": {
            "type": "integer",
            "minimum": MIN_LIMIT,
            "maximum": MAX_LIMIT,
            "description": "Maximum number of results"
        },
        "cursor": {
            "type": "string",
            "description": "Pagination cursor from a previous response"
        }
    })
}

/// Schema with a single required `id` property.
fn id_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "string", "description": description }
        },
        "required": ["id"]
    })
}

/// Merge `extra` properties into an object schema.
fn with_properties(mut schema: Value, extra: Value) -> Value {
    if let (Some(props), Value::Object(extra)) = (
        schema.get_mut("properties").and_then(Value::as_object_mut),
        extra,
    ) {
        props.extend(extra);
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_arg() {
        assert_eq!(instance_arg(&json!({})).unwrap(), None);
        assert_eq!(instance_arg(&Value::Null).unwrap(), None);
        assert_eq!(
            instance_arg(&json!({"instance": "prod"})).unwrap(),
            Some("prod")
        );
        assert!(instance_arg(&json!({"instance": ""})).is_err());
        assert!(instance_arg(&json!({"instance": 7})).is_err());
    }

    #[test]
    fn test_require_str() {
        let args = json!({"id": "42", "blank": "  ", "num": 1});
        assert_eq!(require_str(&args, "id").unwrap(), "42");
        assert!(require_str(&args, "blank").is_err());
        assert!(require_str(&args, "num").is_err());
        assert!(require_str(&args, "missing").is_err());
    }

    #[test]
    fn test_limit_bounds() {
        assert_eq!(optional_limit(&json!({})).unwrap(), None);
        assert_eq!(optional_limit(&json!({"limit": 1})).unwrap(), Some(1));
        assert_eq!(optional_limit(&json!({"limit": 250})).unwrap(), Some(250));
        assert!(optional_limit(&json!({"limit": 0})).is_err());
        assert!(optional_limit(&json!({"limit": 251})).is_err());
        assert!(optional_limit(&json!({"limit": -5})).is_err());
        assert!(optional_limit(&json!({"limit": "10"})).is_err());
    }

    #[test]
    fn test_optional_choice() {
        let args = json!({"status": "error"});
        assert_eq!(
            optional_choice(&args, "status", &["success", "error"]).unwrap(),
            Some("error")
        );
        assert!(optional_choice(&args, "status", &["success"]).is_err());
    }

    #[test]
    fn test_workflow_body_defaults() {
        let body = workflow_body(&json!({
            "workflow": {"name": "Sync", "nodes": [], "id": "ignored", "active": true}
        }))
        .unwrap();
        assert_eq!(
            body,
            json!({"name": "Sync", "nodes": [], "connections": {}, "settings": {}})
        );
    }

    #[test]
    fn test_workflow_body_rejects_bad_shapes() {
        assert!(workflow_body(&json!({})).is_err());
        assert!(workflow_body(&json!({"workflow": []})).is_err());
        assert!(workflow_body(&json!({"workflow": {"nodes": []}})).is_err());
        assert!(workflow_body(&json!({"workflow": {"name": "x"}})).is_err());
        assert!(workflow_body(&json!({"workflow": {"name": "x", "nodes": {}}})).is_err());
        assert!(workflow_body(&json!({
            "workflow": {"name": "x", "nodes": [], "settings": "fast"}
        }))
        .is_err());
    }

    #[test]
    fn test_definition_injects_instance() {
        let registry = ToolRegistry::new();
        for def in registry.list_tools() {
            assert_eq!(
                def.input_schema["properties"][INSTANCE_ARG]["type"], "string",
                "{} lacks instance",
                def.name
            );
        }
    }
}
