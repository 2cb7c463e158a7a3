//! Command-line argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use wikiq_core::LlmConfig;

/// Wikipedia question-answering agent and eval harness
#[derive(Parser, Debug)]
#[command(name = "wikiq")]
#[command(about = "Tool-use Wikipedia agent powered by Claude", long_about = None)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Project root containing configs/, prompts/ and datasets/
    #[arg(long, global = true, env = "WIKIQ_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Anthropic API key (can also use ANTHROPIC_API_KEY env var)
    #[arg(long, global = true, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Override the Messages API base URL
    #[arg(long, global = true, env = "ANTHROPIC_BASE_URL")]
    pub base_url: Option<String>,

    /// LLM request timeout in seconds
    #[arg(long, global = true, default_value = "120")]
    pub llm_timeout: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Answer one question with a configured agent
    Ask {
        /// The question to answer
        query: String,

        /// Agent config name from configs/agents.yaml
        #[arg(long, default_value = "agent_v1")]
        config: String,
    },

    /// Run every dataset in configs/evals.yaml and write a report
    Evals {
        /// Base agent config name
        base: String,

        /// Optional test agent config name to compare against the base
        #[arg(long)]
        test: Option<String>,

        /// Reuse eval_outputs/<RUN_ID> instead of a new timestamped directory
        #[arg(long)]
        run_id: Option<String>,

        /// Maximum concurrent agent runs and judge calls
        #[arg(long, default_value = "2")]
        concurrency: usize,
    },
}

impl Args {
    /// Validate CLI arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.llm_timeout == 0 {
            return Err("llm-timeout must be greater than 0".to_string());
        }

        if let Command::Evals {
            concurrency,
            run_id,
            ..
        } = &self.command
        {
            if *concurrency == 0 {
                return Err("concurrency must be greater than 0".to_string());
            }
            if let Some(id) = run_id {
                if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
                    return Err(format!("Invalid run id '{}'", id));
                }
            }
        }

        Ok(())
    }

    /// Build LlmConfig from CLI arguments.
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig::default().with_timeout(Duration::from_secs(self.llm_timeout))
    }
}
