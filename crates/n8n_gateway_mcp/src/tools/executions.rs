//! Execution Tools - List, Get, Delete

use super::{
    id_schema, optional_bool, optional_choice, optional_limit, optional_str, pagination_schema,
    require_str, with_properties, McpTool,
};
use crate::client::{ApiMethod, ApiRequest};
use crate::error::ToolError;
use n8n_gateway_security::OperationType;
use serde_json::{json, Value};

const STATUSES: &[&str] = &["success", "error", "waiting"];

pub struct ListExecutionsTool;

impl McpTool for ListExecutionsTool {
    fn name(&self) -> &'static str {
        "list_executions"
    }

    fn description(&self) -> &'static str {
        "List workflow executions, optionally filtered by workflow and status"
    }

    fn operation(&self) -> OperationType {
        OperationType::ReadExecution
    }

    fn input_schema(&self) -> Value {
        let schema = json!({
            "type": "object",
            "properties": {
                "workflow_id": { "type": "string" },
                "status": { "type": "string", "enum": STATUSES },
                "include_data": { "type": "boolean", "default": false }
            }
        });
        with_properties(schema, pagination_schema())
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        Ok(ApiRequest::rest(ApiMethod::Get, &["executions"])
            .query_opt("workflowId", optional_str(args, "workflow_id")?)
            .query_opt("status", optional_choice(args, "status", STATUSES)?)
            .query_opt("includeData", optional_bool(args, "include_data")?)
            .query_opt("limit", optional_limit(args)?)
            .query_opt("cursor", optional_str(args, "cursor")?))
    }
}

pub struct GetExecutionTool;

impl McpTool for GetExecutionTool {
    fn name(&self) -> &'static str {
        "get_execution"
    }

    fn description(&self) -> &'static str {
        "Get an execution by ID"
    }

    fn operation(&self) -> OperationType {
        OperationType::ReadExecution
    }

    fn input_schema(&self) -> Value {
        with_properties(
            id_schema("Execution ID"),
            json!({ "include_data": { "type": "boolean", "default": false } }),
        )
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let id = require_str(args, "id")?;
        Ok(ApiRequest::rest(ApiMethod::Get, &["executions", id])
            .query_opt("includeData", optional_bool(args, "include_data")?))
    }
}

pub struct DeleteExecutionTool;

impl McpTool for DeleteExecutionTool {
    fn name(&self) -> &'static str {
        "delete_execution"
    }

    fn description(&self) -> &'static str {
        "Delete an execution record"
    }

    fn operation(&self) -> OperationType {
        OperationType::DeleteExecution
    }

    fn input_schema(&self) -> Value {
        id_schema("Execution ID")
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let id = require_str(args, "id")?;
        Ok(ApiRequest::rest(ApiMethod::Delete, &["executions", id]))
    }
}
