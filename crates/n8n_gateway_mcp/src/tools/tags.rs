//! Tag Tools - List, Create, Update, Delete
//!
//! Listing tags is a read; every mutation needs `manage_tags`.

use super::{
    id_schema, optional_limit, optional_str, pagination_schema, require_str, with_properties,
    McpTool,
};
use crate::client::{ApiMethod, ApiRequest};
use crate::error::ToolError;
use n8n_gateway_security::OperationType;
use serde_json::{json, Value};

fn name_schema() -> Value {
    json!({ "name": { "type": "string", "description": "Tag name" } })
}

pub struct ListTagsTool;

impl McpTool for ListTagsTool {
    fn name(&self) -> &'static str {
        "list_tags"
    }

    fn description(&self) -> &'static str {
        "List workflow tags"
    }

    fn operation(&self) -> OperationType {
        OperationType::ReadWorkflow
    }

    fn input_schema(&self) -> Value {
        with_properties(
            json!({ "type": "object", "properties": {} }),
            pagination_schema(),
        )
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        Ok(ApiRequest::rest(ApiMethod::Get, &["tags"])
            .query_opt("limit", optional_limit(args)?)
            .query_opt("cursor", optional_str(args, "cursor")?))
    }
}

pub struct CreateTagTool;

impl McpTool for CreateTagTool {
    fn name(&self) -> &'static str {
        "create_tag"
    }

    fn description(&self) -> &'static str {
        "Create a tag"
    }

    fn operation(&self) -> OperationType {
        OperationType::ManageTags
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": name_schema(),
            "required": ["name"]
        })
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let name = require_str(args, "name")?;
        Ok(ApiRequest::rest(ApiMethod::Post, &["tags"]).body(json!({ "name": name })))
    }
}

pub struct UpdateTagTool;

impl McpTool for UpdateTagTool {
    fn name(&self) -> &'static str {
        "update_tag"
    }

    fn description(&self) -> &'static str {
        "Rename a tag"
    }

    fn operation(&self) -> OperationType {
        OperationType::ManageTags
    }

    fn input_schema(&self) -> Value {
        let mut schema = with_properties(id_schema("Tag ID"), name_schema());
        schema["required"] = json!(["id", "name"]);
        schema
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let id = require_str(args, "id")?;
        let name = require_str(args, "name")?;
        Ok(ApiRequest::rest(ApiMethod::Put, &["tags", id]).body(json!({ "name": name })))
    }
}

pub struct DeleteTagTool;

impl McpTool for DeleteTagTool {
    fn name(&self) -> &'static str {
        "delete_tag"
    }

    fn description(&self) -> &'static str {
        "Delete a tag"
    }

    fn operation(&self) -> OperationType {
        OperationType::ManageTags
    }

    fn input_schema(&self) -> Value {
        id_schema("Tag ID")
    }

    fn prepare(&self, args: &Value) -> Result<ApiRequest, ToolError> {
        let id = require_str(args, "id")?;
        Ok(ApiRequest::rest(ApiMethod::Delete, &["tags", id]))
    }
}
