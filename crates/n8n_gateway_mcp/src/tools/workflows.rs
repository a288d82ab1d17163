//! Workflow Tools - List, Get, Create, Update, Delete, Activate, Execute
//!
//! Thin wrappers over `/api/v1/workflows`. Execution goes through the
//! workflow's webhook trigger since the public API has no run endpoint.

use super::{
    id_schema, optional_bool, optional_choice, optional_limit, optional_str, pagination_schema,
    require_str, with_properties, workflow_body, McpTool,
};
use crate::client::{ApiMethod, ApiRequest};
use crate::error::ToolError;
use n8n_gateway_security::OperationType;
use serde_json::{json, Value};

fn workflow_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "name": { "type": "string" },
            "nodes": { "type": "array", "items": { "type": "object" } },
            "connections": { "type": "object" },
            "settings": { "type": "object" },
            "staticData": { "type": "object" }
        },
        "required": ["name", "nodes"]
    })
}

// ============================================================================
// list_workflows
// ============================================================================

pub struct ListWorkflowsTool;

impl McpTool for ListWorkflowsTool {
    fn name(&self) -> &'static str {
        "list_workflows"
    }

    fn description(&self) -> &'static str {
        "List workflows, optionally filtered by active state, tags or name"
    }

    fn operation(&self) -> OperationType {
        OperationType::ReadWorkflow
    }

    fn input_schema(&self) -> Value {
        let schema = json!({
            "type": "object",
            "properties": {
                "active": { "type": "boolean" },
                "tags": { "type": "string", "description": "Comma-separated tag names" },
                "name": { "type": "string" }
            }
        });
        with_properties(schema, pagination_schema())
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        Ok(ApiRequest::rest(ApiMethod::Get, &["workflows"])
            .query_opt("active", optional_bool(args, "active")?)
            .query_opt("tags", optional_str(args, "tags")?)
            .query_opt("name", optional_str(args, "name")?)
            .query_opt("limit", optional_limit(args)?)
            .query_opt("cursor", optional_str(args, "cursor")?))
    }
}

// ============================================================================
// get_workflow
// ============================================================================

pub struct GetWorkflowTool;

impl McpTool for GetWorkflowTool {
    fn name(&self) -> &'static str {
        "get_workflow"
    }

    fn description(&self) -> &'static str {
        "Get a workflow by ID"
    }

    fn operation(&self) -> OperationType {
        OperationType::ReadWorkflow
    }

    fn input_schema(&self) -> Value {
        id_schema("Workflow ID")
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let id = require_str(args, "id")?;
        Ok(ApiRequest::rest(ApiMethod::Get, &["workflows", id]))
    }
}

// ============================================================================
// create_workflow
// ============================================================================

pub struct CreateWorkflowTool;

impl McpTool for CreateWorkflowTool {
    fn name(&self) -> &'static str {
        "create_workflow"
    }

    fn description(&self) -> &'static str {
        "Create a workflow from a name, nodes and connections"
    }

    fn operation(&self) -> OperationType {
        OperationType::CreateWorkflow
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "workflow": workflow_schema("Workflow definition")
            },
            "required": ["workflow"]
        })
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let body = workflow_body(args)?;
        Ok(ApiRequest::rest(ApiMethod::Post, &["workflows"]).body(body))
    }
}

// ============================================================================
// update_workflow
// ============================================================================

pub struct UpdateWorkflowTool;

impl McpTool for UpdateWorkflowTool {
    fn name(&self) -> &'static str {
        "update_workflow"
    }

    fn description(&self) -> &'static str {
        "Replace a workflow's definition"
    }

    fn operation(&self) -> OperationType {
        OperationType::UpdateWorkflow
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Workflow ID" },
                "workflow": workflow_schema("Full workflow definition")
            },
            "required": ["id", "workflow"]
        })
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let id = require_str(args, "id")?;
        let body = workflow_body(args)?;
        Ok(ApiRequest::rest(ApiMethod::Put, &["workflows", id]).body(body))
    }
}

// ============================================================================
// delete_workflow
// ============================================================================

pub struct DeleteWorkflowTool;

impl McpTool for DeleteWorkflowTool {
    fn name(&self) -> &'static str {
        "delete_workflow"
    }

    fn description(&self) -> &'static str {
        "Delete a workflow"
    }

    fn operation(&self) -> OperationType {
        OperationType::DeleteWorkflow
    }

    fn input_schema(&self) -> Value {
        id_schema("Workflow ID")
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let id = require_str(args, "id")?;
        Ok(ApiRequest::rest(ApiMethod::Delete, &["workflows", id]))
    }
}

// ============================================================================
// activate_workflow / deactivate_workflow
// ============================================================================

pub struct ActivateWorkflowTool;

impl McpTool for ActivateWorkflowTool {
    fn name(&self) -> &'static str {
        "activate_workflow"
    }

    fn description(&self) -> &'static str {
        "Activate a workflow so its triggers run"
    }

    fn operation(&self) -> OperationType {
        OperationType::ActivateWorkflow
    }

    fn input_schema(&self) -> Value {
        id_schema("Workflow ID")
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let id = require_str(args, "id")?;
        Ok(ApiRequest::rest(ApiMethod::Post, &["workflows", id, "activate"]))
    }
}

pub struct DeactivateWorkflowTool;

impl McpTool for DeactivateWorkflowTool {
    fn name(&self) -> &'static str {
        "deactivate_workflow"
    }

    fn description(&self) -> &'static str {
        "Deactivate a workflow"
    }

    fn operation(&self) -> OperationType {
        OperationType::DeactivateWorkflow
    }

    fn input_schema(&self) -> Value {
        id_schema("Workflow ID")
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let id = require_str(args, "id")?;
        Ok(ApiRequest::rest(ApiMethod::Post, &["workflows", id, "deactivate"]))
    }
}

// ============================================================================
// execute_workflow
// ============================================================================

pub struct ExecuteWorkflowTool;

impl McpTool for ExecuteWorkflowTool {
    fn name(&self) -> &'static str {
        "execute_workflow"
    }

    fn description(&self) -> &'static str {
        "Trigger a workflow through its webhook node"
    }

    fn operation(&self) -> OperationType {
        OperationType::ExecuteWorkflow
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "webhook_path": {
                    "type": "string",
                    "description": "Path configured on the workflow's Webhook node"
                },
                "method": { "type": "string", "enum": ["GET", "POST"], "default": "POST" },
                "data": { "type": "object", "description": "Payload (query parameters for GET)" },
                "test_mode": {
                    "type": "boolean",
                    "default": false,
                    "description": "Use the test webhook URL"
                }
            },
            "required": ["webhook_path"]
        })
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let path = require_str(args, "webhook_path")?;
        let method = match optional_choice(args, "method", &["GET", "POST"])? {
            Some("GET") => ApiMethod::Get,
            _ => ApiMethod::Post,
        };
        let test = optional_bool(args, "test_mode")?.unwrap_or(false);
        let data = match args.get("data") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => return Err(ToolError::invalid("data", "must be an object")),
        };

        let mut request = ApiRequest::webhook(method, path, test);
        if let Some(data) = data {
            match method {
                ApiMethod::Get => {
                    for (key, value) in data {
                        request = match value {
                            Value::String(s) => request.query(key, s),
                            other => request.query(key, other),
                        };
                    }
                }
                _ => request = request.body(Value::Object(data.clone())),
            }
        }
        Ok(request)
    }
}
