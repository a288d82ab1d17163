//! Tool Registry - Tool Discovery and Lookup
//!
//! Maintains the list of available tools. Dispatch happens in the server,
//! which has to run the gate between lookup and execution.

use super::*;
use crate::protocol::ToolDefinition;
use std::collections::HashMap;
use tracing::debug;

/// Registry of available MCP tools
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn McpTool>>,
}

impl ToolRegistry {
    /// Create a new tool registry with all tools registered
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Box::new(workflows::ListWorkflowsTool));
        registry.register(Box::new(workflows::GetWorkflowTool));
        registry.register(Box::new(workflows::CreateWorkflowTool));
        registry.register(Box::new(workflows::UpdateWorkflowTool));
        registry.register(Box::new(workflows::DeleteWorkflowTool));
        registry.register(Box::new(workflows::ActivateWorkflowTool));
        registry.register(Box::new(workflows::DeactivateWorkflowTool));
        registry.register(Box::new(workflows::ExecuteWorkflowTool));
        registry.register(Box::new(executions::ListExecutionsTool));
        registry.register(Box::new(executions::GetExecutionTool));
        registry.register(Box::new(executions::DeleteExecutionTool));
        registry.register(Box::new(tags::ListTagsTool));
        registry.register(Box::new(tags::CreateTagTool));
        registry.register(Box::new(tags::UpdateTagTool));
        registry.register(Box::new(tags::DeleteTagTool));

        debug!("Registered {} tools", registry.tools.len());

        registry
    }

    fn register(&mut self, tool: Box<dyn McpTool>) {
        let name = tool.name().to_string();
        debug!("Registering tool: {}", name);
        self.tools.insert(name, tool);
    }

    /// All tool definitions, sorted by name
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        let mut tools: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&dyn McpTool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
