//! Project-root config and prompt loading.
//!
//! All configuration lives in YAML files under a single project root:
//!
//! ```text
//! <root>/configs/agents.yaml            agent name -> AgentConfig
//! <root>/configs/evals.yaml             dataset name -> eval entry
//! <root>/prompts/system_instructions.yaml
//! <root>/prompts/tool_descriptions.yaml
//! <root>/prompts/evals.yaml             judge prompt name -> template
//! <root>/eval_outputs/                  run directories and TEMPLATE.md
//! ```

use crate::config::AgentConfig;
use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Resolves config files relative to a project root.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
}

impl ConfigLoader {
    /// Create a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path relative to the project root.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn agents_path(&self) -> PathBuf {
        self.root.join("configs").join("agents.yaml")
    }

    pub fn evals_path(&self) -> PathBuf {
        self.root.join("configs").join("evals.yaml")
    }

    pub fn system_instructions_path(&self) -> PathBuf {
        self.root.join("prompts").join("system_instructions.yaml")
    }

    pub fn tool_descriptions_path(&self) -> PathBuf {
        self.root.join("prompts").join("tool_descriptions.yaml")
    }

    pub fn eval_prompts_path(&self) -> PathBuf {
        self.root.join("prompts").join("evals.yaml")
    }

    pub fn eval_outputs_dir(&self) -> PathBuf {
        self.root.join("eval_outputs")
    }

    pub fn report_template_path(&self) -> PathBuf {
        self.eval_outputs_dir().join("TEMPLATE.md")
    }

    /// Load a named agent config.
    ///
    /// A missing `agents.yaml` yields the default config for any name. When
    /// the file exists the name must be present; an entry with no body gets
    /// the defaults.
    pub fn load_agent_config(&self, name: &str) -> Result<AgentConfig, ConfigError> {
        let path = self.agents_path();
        if !path.exists() {
            log::debug!(
                "{} not found, using default config for '{}'",
                path.display(),
                name
            );
            return Ok(AgentConfig::default());
        }

        let mut agents: HashMap<String, Option<AgentConfig>> = read_yaml_file(&path)?;
        match agents.remove(name) {
            Some(config) => Ok(config.unwrap_or_default()),
            None => Err(ConfigError::NotFound {
                kind: "Agent config",
                name: name.to_string(),
                path,
            }),
        }
    }

    /// Load a named system instruction.
    pub fn load_system_instruction(&self, name: &str) -> Result<String, ConfigError> {
        let path = self.system_instructions_path();
        let mut instructions: HashMap<String, String> =
            read_required(&path, "System instructions")?;
        instructions
            .remove(name)
            .ok_or_else(|| ConfigError::NotFound {
                kind: "System instruction",
                name: name.to_string(),
                path,
            })
    }

    /// Load a named tool description set (tool name -> description).
    pub fn load_tool_descriptions(
        &self,
        name: &str,
    ) -> Result<HashMap<String, String>, ConfigError> {
        let path = self.tool_descriptions_path();
        let mut sets: HashMap<String, HashMap<String, String>> =
            read_required(&path, "Tool descriptions")?;
        sets.remove(name).ok_or_else(|| ConfigError::NotFound {
            kind: "Tool description set",
            name: name.to_string(),
            path,
        })
    }
}

/// Append `suffix` to a base instruction after a blank line.
///
/// Trailing whitespace of the base is trimmed first. An empty suffix returns
/// the base unchanged.
pub fn build_system_instruction(base: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return base.to_string();
    }
    format!("{}\n\n{}", base.trim_end(), suffix)
}

/// Read and parse a YAML file.
///
/// An empty file parses as `T::default()`.
pub fn read_yaml_file<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if contents.trim().is_empty() {
        return Ok(T::default());
    }

    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`read_yaml_file`], but a missing file is a [`ConfigError::MissingFile`].
pub fn read_required<T>(path: &Path, kind: &'static str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Err(ConfigError::MissingFile {
            kind,
            path: path.to_path_buf(),
        });
    }
    read_yaml_file(path)
}
