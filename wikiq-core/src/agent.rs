//! Tool-use agent loop.
//!
//! [`ToolAgent::run`] drives one query to completion: it calls the model with
//! the running transcript, executes any requested tools, feeds their results
//! back, and stops on `end_turn`, any other terminal stop reason, or when the
//! turn budget is spent.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wikiq_core::{AgentProfile, ConfigLoader, LlmConfig, ModelClient, ToolAgent, ToolRegistry};
//! use wikiq_core::mock_llm::{text_response, ScriptedProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(ToolRegistry::new());
//! let loader = ConfigLoader::new(".");
//! let profile = AgentProfile::load(&loader, "agent_v1", &registry)?;
//! let agent = ToolAgent::new(profile, registry);
//!
//! let provider = Arc::new(ScriptedProvider::new(vec![text_response("Paris.")]));
//! let llm = ModelClient::new(provider, LlmConfig::default());
//! let result = agent.run("What is the capital of France?", &llm).await?;
//! println!("{} ({} turns)", result.final_text, result.turn_count);
//! # Ok(())
//! # }
//! ```

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::llm::{ModelClient, ModelRequest, StopReason};
use crate::loader::ConfigLoader;
use crate::message::{ContentBlock, Message};
use crate::tool::{ToolDefinition, ToolRegistry};
use crate::utils::truncate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Max characters of tool input shown in the `[tool call]` log line
const LOG_INPUT_PREVIEW_CHARS: usize = 200;

/// One executed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub input: Value,
    pub output: String,
}

/// Outcome of a single agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Text of the last assistant message
    pub final_text: String,

    /// Full transcript, starting with the user query
    pub messages: Vec<Message>,

    /// Model calls made, between 1 and `max_turns`
    pub turn_count: u32,

    /// Tool invocations in execution order
    pub tool_calls_made: Vec<ToolCallRecord>,
}

impl AgentResult {
    /// Whether any recorded call used `tool`.
    pub fn called_tool(&self, tool: &str) -> bool {
        self.tool_calls_made.iter().any(|call| call.tool == tool)
    }
}

/// Everything an agent needs besides its tools and model client.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AgentProfile {
    /// Name the profile was loaded under
    pub name: String,
    pub config: AgentConfig,
    pub system_prompt: String,
    pub tools: Vec<ToolDefinition>,
}

impl AgentProfile {
    pub fn new(
        name: impl Into<String>,
        config: AgentConfig,
        system_prompt: impl Into<String>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            system_prompt: system_prompt.into(),
            tools,
        }
    }

    /// Resolve a named agent: its config, its system instruction, and the
    /// definitions of every registered tool under its description set.
    pub fn load(
        loader: &ConfigLoader,
        name: &str,
        registry: &ToolRegistry,
    ) -> Result<Self, AgentError> {
        let config = loader.load_agent_config(name)?;
        config.validate()?;
        let system_prompt = loader.load_system_instruction(&config.system_instruction)?;
        let descriptions = loader.load_tool_descriptions(&config.tool_description)?;
        let tools = registry.definitions(&descriptions)?;

        log::debug!(
            "Loaded agent '{}' (model={}, max_turns={}, tools={})",
            name,
            config.model,
            config.max_turns,
            tools.len()
        );

        Ok(Self::new(name, config, system_prompt, tools))
    }
}

/// An agent that answers queries with model calls and registered tools.
#[derive(Debug, Clone)]
pub struct ToolAgent {
    profile: AgentProfile,
    registry: Arc<ToolRegistry>,
}

impl ToolAgent {
    pub fn new(profile: AgentProfile, registry: Arc<ToolRegistry>) -> Self {
        Self { profile, registry }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Run `query` to completion.
    ///
    /// # Errors
    ///
    /// - `AgentError::InvalidConfig` if `max_turns` is zero or the config is
    ///   otherwise invalid
    /// - `AgentError::Llm` if a model call fails after retries
    ///
    /// Tool failures never surface here; they are returned to the model as
    /// tool-result text.
    pub async fn run(&self, query: &str, llm: &ModelClient) -> Result<AgentResult, AgentError> {
        let config = &self.profile.config;
        config.validate()?;

        let mut messages = vec![Message::user(query)];
        let mut tool_calls_made = Vec::new();
        let mut final_text = String::new();
        let mut turn_count = 0;

        for turn in 1..=config.max_turns {
            turn_count = turn;

            let mut request =
                ModelRequest::new(&config.model, config.max_tokens, messages.clone())
                    .with_tools(self.profile.tools.clone());
            if !self.profile.system_prompt.is_empty() {
                request = request.with_system(&self.profile.system_prompt);
            }

            let response = llm.create(&request).await?;
            final_text = response.text();
            messages.push(Message::assistant(response.content.clone()));

            match response.stop_reason {
                Some(StopReason::ToolUse) => {
                    let mut results = Vec::new();
                    for (id, name, input) in response.tool_uses() {
                        let output = self.call_tool(name, input).await;
                        tool_calls_made.push(ToolCallRecord {
                            tool: name.to_string(),
                            input: input.clone(),
                            output: output.clone(),
                        });
                        results.push(ContentBlock::tool_result(id, output));
                    }

                    if results.is_empty() {
                        log::warn!(
                            "Turn {}: stop reason tool_use without tool_use blocks, stopping",
                            turn
                        );
                        break;
                    }
                    messages.push(Message::user_blocks(results));
                }
                Some(StopReason::EndTurn) => break,
                other => {
                    log::debug!("Turn {}: stopping on {:?}", turn, other);
                    break;
                }
            }

            if turn == config.max_turns {
                log::warn!(
                    "Agent '{}' reached max turns ({}) for query: {}",
                    self.profile.name,
                    config.max_turns,
                    truncate(query, LOG_INPUT_PREVIEW_CHARS)
                );
            }
        }

        Ok(AgentResult {
            final_text,
            messages,
            turn_count,
            tool_calls_made,
        })
    }

    /// Execute one tool call, turning every failure into result text.
    async fn call_tool(&self, name: &str, input: &Value) -> String {
        log::info!(
            "[tool call] {}({})",
            name,
            truncate(&input.to_string(), LOG_INPUT_PREVIEW_CHARS)
        );

        let Some(tool) = self.registry.get(name) else {
            log::warn!("Model requested unknown tool '{}'", name);
            return format!("Error: unknown tool '{}'", name);
        };

        match tool.execute(input.clone()).await {
            Ok(output) => output,
            Err(e) => {
                log::warn!("Tool '{}' failed: {}", name, e);
                format!("Error calling {}: {}", name, e)
            }
        }
    }
}
