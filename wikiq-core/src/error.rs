use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during an agent run
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    /// Model call failed after retries
    #[error("LLM client error: {0}")]
    Llm(#[from] LlmError),

    /// Failed to resolve the agent's config, prompt or tool descriptions
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that can occur in the model client
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    /// Provider answered with a non-success HTTP status
    #[error("HTTP {status} from model provider: {body}")]
    Http { status: u16, body: String },

    /// Could not reach the provider
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timed out
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No API key was configured
    #[error("Missing API key: set {0}")]
    MissingApiKey(&'static str),

    /// Other LLM error
    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Check if this error is transient.
    ///
    /// Status errors, connection failures and timeouts are retried; decode
    /// failures and everything else are returned immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Http { .. } | LlmError::Connection(_) | LlmError::Timeout(_)
        )
    }
}

/// Errors raised while loading configs and prompts from the project root
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Failed to read a config file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for the expected shape
    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required file does not exist
    #[error("{kind} file not found: {path}")]
    MissingFile { kind: &'static str, path: PathBuf },

    /// A named entry is absent from its file
    #[error("{kind} '{name}' not found in {path}")]
    NotFound {
        kind: &'static str,
        name: String,
        path: PathBuf,
    },

    /// The description set has no entry for a registered tool
    #[error("No description for tool '{0}'")]
    MissingToolDescription(String),

    /// A template references an unknown placeholder or has unbalanced braces
    #[error("Template error: {0}")]
    Template(String),
}
