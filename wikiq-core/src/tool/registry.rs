//! Tool registry for managing available tools.

use super::{build_tool_definition, Tool, ToolDefinition};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available tools.
///
/// Built once at process start and shared behind an `Arc`. Tools are stored
/// as `Arc<dyn Tool>`, so the registry is `Send + Sync`.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool in the registry.
    ///
    /// If a tool with the same name already exists, it will be replaced.
    /// Returns `&mut Self` for chaining.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> &mut Self {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
        self
    }

    /// Register a tool that's already wrapped in Arc.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tool names, sorted alphabetically.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    /// Check if a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Build model-facing definitions for every registered tool, in name order.
    ///
    /// Fails if `descriptions` lacks an entry for any registered tool.
    pub fn definitions(
        &self,
        descriptions: &HashMap<String, String>,
    ) -> Result<Vec<ToolDefinition>, ConfigError> {
        self.list()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| build_tool_definition(tool.as_ref(), descriptions))
            .collect()
    }
}
