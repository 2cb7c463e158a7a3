//! Tool abstraction for agent actions.
//!
//! This module provides the [`Tool`] trait and [`ToolRegistry`] for the tools
//! an agent can invoke.
//!
//! # Design
//!
//! - **Async execution**: tools are usually I/O-bound (HTTP search)
//! - **External descriptions**: a tool owns its name and input schema, but the
//!   description shown to the model comes from a named description set in
//!   `prompts/tool_descriptions.yaml`, so prompt variants can be evaluated
//!   without code changes
//!
//! # Example
//!
//! ```no_run
//! use wikiq_core::tool::{Tool, ToolError, ToolRegistry};
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! #[derive(Debug)]
//! struct Echo;
//!
//! #[async_trait]
//! impl Tool for Echo {
//!     fn name(&self) -> &str { "echo" }
//!     fn input_schema(&self) -> Value {
//!         json!({
//!             "type": "object",
//!             "properties": { "text": { "type": "string" } },
//!             "required": ["text"]
//!         })
//!     }
//!     async fn execute(&self, input: Value) -> Result<String, ToolError> {
//!         Ok(input["text"].as_str().unwrap_or("").to_string())
//!     }
//! }
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(Echo);
//! assert!(registry.contains("echo"));
//! ```

mod registry;

pub use registry::ToolRegistry;

use crate::error::ConfigError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// Invalid input provided to the tool.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tool execution failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Tool execution timed out.
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// A tool that agents can invoke.
#[async_trait]
pub trait Tool: Send + Sync + fmt::Debug {
    /// Unique identifier sent to the model (e.g. "search_wikipedia").
    fn name(&self) -> &str;

    /// JSON Schema for the tool's input object.
    fn input_schema(&self) -> Value;

    /// Run the tool and return the text handed back to the model.
    async fn execute(&self, input: Value) -> Result<String, ToolError>;
}

/// Tool schema as sent to the model in a request's `tools` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Combine a tool's input schema with its description from `descriptions`.
///
/// Returns [`ConfigError::MissingToolDescription`] when the set has no entry
/// for the tool's name.
pub fn build_tool_definition(
    tool: &dyn Tool,
    descriptions: &HashMap<String, String>,
) -> Result<ToolDefinition, ConfigError> {
    let name = tool.name();
    let description = descriptions
        .get(name)
        .ok_or_else(|| ConfigError::MissingToolDescription(name.to_string()))?;

    Ok(ToolDefinition {
        name: name.to_string(),
        description: description.trim().to_string(),
        input_schema: tool.input_schema(),
    })
}
