//! # Wikiq Core
//!
//! Core library for a minimal tool-use question-answering agent.
//!
//! This crate provides the pieces needed to answer a question with a model
//! that can call tools: the Messages API data model, a retrying model client,
//! the tool registry and the agent turn-loop, plus config and prompt loading
//! from a project root.
//!
//! ## Architecture
//!
//! - **Injected model client**: [`ModelClient`] wraps any [`ModelProvider`];
//!   production uses [`AnthropicProvider`], tests use
//!   [`mock_llm::ScriptedProvider`]
//! - **Externalized prompts**: system instructions and tool descriptions are
//!   named entries in YAML files, selected per agent config
//! - **Recoverable tool failures**: unknown tools and tool errors become
//!   tool-result text the model can react to
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wikiq_core::{AgentProfile, AnthropicProvider, ConfigLoader, LlmConfig, ModelClient, ToolAgent, ToolRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LlmConfig::default();
//! let llm = ModelClient::new(Arc::new(AnthropicProvider::from_env(&config)?), config);
//!
//! let registry = Arc::new(ToolRegistry::new());
//! let profile = AgentProfile::load(&ConfigLoader::new("."), "agent_v1", &registry)?;
//! let agent = ToolAgent::new(profile, registry);
//!
//! let result = agent.run("Who wrote Middlemarch?", &llm).await?;
//! println!("{}", result.final_text);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod loader;
pub mod message;
pub mod mock_llm;
pub mod tool;
pub mod utils;

// Re-export public API
pub use agent::{AgentProfile, AgentResult, ToolAgent, ToolCallRecord};
pub use config::{AgentConfig, LlmConfig, DEFAULT_MODEL, DEFAULT_PROMPT_NAME};
pub use error::{AgentError, ConfigError, LlmError};
pub use llm::{
    AnthropicProvider, ModelClient, ModelProvider, ModelRequest, ModelResponse, StopReason, Usage,
};
pub use loader::{build_system_instruction, read_required, read_yaml_file, ConfigLoader};
pub use message::{ContentBlock, Message, MessageContent, Role};
pub use tool::{build_tool_definition, Tool, ToolDefinition, ToolError, ToolRegistry};
pub use utils::{format_template, truncate};
