use crate::dataset::DatasetError;
use std::path::PathBuf;
use thiserror::Error;
use wikiq_core::{AgentError, ConfigError, LlmError};

/// Errors that can occur during an eval run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvalError {
    /// Failed to load configs, prompts or templates
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to load or read a dataset
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// An agent run failed
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// A judge model call failed after retries
    #[error("Judge LLM error: {0}")]
    Llm(#[from] LlmError),

    /// A dataset names a rater that does not exist
    #[error("Unknown rater type '{rater}' for dataset '{dataset}'")]
    UnknownRater { dataset: String, rater: String },

    /// A onesided dataset has no rubric dimensions
    #[error("Dataset '{0}' uses the onesided rater but defines no dimensions")]
    MissingDimensions(String),

    /// A judge prompt is absent from prompts/evals.yaml
    #[error("Judge prompt '{0}' not found")]
    MissingPrompt(String),

    /// Filesystem failure inside the run directory
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write or read a persisted JSON file
    #[error("JSON error at {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl EvalError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }
}
