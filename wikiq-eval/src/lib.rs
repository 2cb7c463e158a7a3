//! # Wikiq Eval
//!
//! Evaluation harness for wikiq agents.
//!
//! ## Overview
//!
//! - **Datasets**: YAML or JSON lists of items with a `query` and
//!   rater-specific fields
//! - **Trajectory rater**: was the search tool called when it should have
//!   been? Reports accuracy, precision, recall and F1
//! - **Rubric rater**: an LLM judge scores each answer from 1 to 3 on
//!   configured dimensions
//! - **Runner**: runs a base agent and an optional test agent over every
//!   configured dataset, persists transcripts and judge outputs into a run
//!   directory, and renders a Markdown report
//!
//! ## Architecture
//!
//! ```text
//! wikiq-core (agent loop, model client, tools)
//!     ↓
//! wikiq-eval (datasets, raters, run directories, reports)  ← this crate
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wikiq_core::{AnthropicProvider, ConfigLoader, LlmConfig, ModelClient, ToolRegistry};
//! use wikiq_eval::EvalRunner;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LlmConfig::default();
//! let llm = Arc::new(ModelClient::new(
//!     Arc::new(AnthropicProvider::from_env(&config)?),
//!     config,
//! ));
//!
//! let runner = EvalRunner::new(ConfigLoader::new("."), llm, Arc::new(ToolRegistry::new()));
//! let run_dir = runner.run("agent_v1", None, None).await?;
//! println!("Report: {}", run_dir.join("report.md").display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Resuming
//!
//! Passing a `run_id` reopens `eval_outputs/<run_id>`. Configured datasets
//! are recomputed, and the report covers every judge output in the
//! directory, including ones left by earlier invocations.

pub mod config;
pub mod dataset;
pub mod error;
pub mod onesided;
pub mod pool;
pub mod report;
pub mod run_dir;
pub mod runner;
pub mod trajectory;

// Re-export public API
pub use config::{DatasetConfig, DatasetPlan, EvalConfig, RaterKind, RaterPlan};
pub use dataset::{load_dataset, DatasetError, DatasetItem};
pub use error::EvalError;
pub use onesided::{JudgeConfig, OnesidedItem, OnesidedJudge, OnesidedResult};
pub use pool::try_map_ordered;
pub use report::{aggregate, render_report, ReportData, SidePair, DEFAULT_TEMPLATE};
pub use run_dir::{
    JudgeOutput, OnesidedOutput, OnesidedOutputItem, RunDir, Side, TranscriptRecord,
    TrajectoryOutput,
};
pub use runner::{EvalProgress, EvalRunner};
pub use trajectory::{
    ConfusionCounts, TrajectoryItem, TrajectoryMetrics, TrajectoryRater, TrajectoryResult,
};
