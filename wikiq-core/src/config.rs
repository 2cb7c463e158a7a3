use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model used when an agent config does not name one
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Name of the system instruction and tool description set used by default
pub const DEFAULT_PROMPT_NAME: &str = "default";

/// Configuration for one named agent.
///
/// Loaded from `configs/agents.yaml`. Every field is optional in the file;
/// unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct AgentConfig {
    /// Model identifier sent to the provider
    ///
    /// Default: `claude-sonnet-4-20250514`
    pub model: String,

    /// Maximum tokens per model response
    ///
    /// Default: 4096
    pub max_tokens: u32,

    /// Hard cap on model calls for a single query
    ///
    /// Default: 10
    pub max_turns: u32,

    /// Key into `prompts/system_instructions.yaml`
    pub system_instruction: String,

    /// Key into `prompts/tool_descriptions.yaml`
    pub tool_description: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            max_turns: 10,
            system_instruction: DEFAULT_PROMPT_NAME.to_string(),
            tool_description: DEFAULT_PROMPT_NAME.to_string(),
        }
    }
}

impl AgentConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), AgentError> {
        let mut errors = Vec::new();

        if self.model.trim().is_empty() {
            errors.push("model must not be empty");
        }
        if self.max_tokens == 0 {
            errors.push("max_tokens must be greater than zero");
        }
        if self.max_turns == 0 {
            errors.push("max_turns must be greater than zero");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AgentError::InvalidConfig(errors.join("; ")))
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    #[must_use]
    pub fn with_system_instruction(mut self, name: impl Into<String>) -> Self {
        self.system_instruction = name.into();
        self
    }

    #[must_use]
    pub fn with_tool_description(mut self, name: impl Into<String>) -> Self {
        self.tool_description = name.into();
        self
    }
}

/// Configuration for the model client
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct LlmConfig {
    /// Timeout for individual model requests
    ///
    /// Default: 120 seconds
    pub timeout: Duration,

    /// Total attempts per request, including the first
    ///
    /// Default: 3
    pub max_attempts: u32,

    /// Base delay for exponential backoff (milliseconds)
    ///
    /// Default: 3000ms
    pub retry_base_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_attempts: 3,
            retry_base_delay_ms: 3000,
        }
    }
}

impl LlmConfig {
    /// Set the timeout for individual model requests.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the total number of attempts per request.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base delay for exponential backoff (milliseconds).
    #[must_use]
    pub fn with_retry_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_base_delay_ms = delay_ms;
        self
    }

    /// Get the retry delay after a failed attempt (0-indexed)
    ///
    /// Uses exponential backoff: delay = base_delay * 2^attempt, capped at
    /// 60 seconds.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        const MAX_DELAY_MS: u64 = 60_000;

        let delay_ms = self
            .retry_base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(MAX_DELAY_MS);

        Duration::from_millis(delay_ms)
    }
}
