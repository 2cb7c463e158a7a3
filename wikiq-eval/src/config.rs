//! Eval configuration: which datasets to run and how to rate them.
//!
//! `configs/evals.yaml` maps dataset names to entries:
//!
//! ```yaml
//! tool_triggering:
//!   path: datasets/tool_triggering.yaml
//!   rater: trajectory
//! answer_quality:
//!   path: datasets/answer_quality.yaml
//!   rater: onesided
//!   judge_model: claude-haiku-4-5-20251001
//!   dimensions:
//!     correctness: |
//!       3 = fully correct ...
//! ```
//!
//! [`EvalConfig::plan`] validates every entry before any agent runs.

use crate::error::EvalError;
use crate::onesided::{JudgeConfig, MAX_EVAL_CONCURRENCY};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use wikiq_core::{read_required, ConfigLoader};

/// Key of the rubric judge template in `prompts/evals.yaml`.
pub const ONESIDED_PROMPT: &str = "onesided";

/// One dataset entry as written in `configs/evals.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetConfig {
    /// Dataset file, relative to the project root
    pub path: String,

    /// Rater name: `trajectory` or `onesided`
    pub rater: String,

    /// Rubric dimensions (name -> rubric text), onesided only
    #[serde(default)]
    pub dimensions: Option<IndexMap<String, String>>,

    #[serde(default)]
    pub judge_model: Option<String>,

    #[serde(default)]
    pub judge_max_tokens: Option<u32>,
}

/// The parsed `configs/evals.yaml`, in file order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct EvalConfig {
    pub datasets: IndexMap<String, DatasetConfig>,
}

/// Known rater kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaterKind {
    Trajectory,
    Onesided,
}

impl RaterKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "trajectory" => Some(RaterKind::Trajectory),
            "onesided" => Some(RaterKind::Onesided),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RaterKind::Trajectory => "trajectory",
            RaterKind::Onesided => "onesided",
        }
    }
}

impl fmt::Display for RaterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated rater with everything it needs.
#[derive(Debug, Clone)]
pub enum RaterPlan {
    Trajectory,
    Onesided {
        dimensions: IndexMap<String, String>,
        judge: JudgeConfig,
        template: String,
    },
}

impl RaterPlan {
    pub fn kind(&self) -> RaterKind {
        match self {
            RaterPlan::Trajectory => RaterKind::Trajectory,
            RaterPlan::Onesided { .. } => RaterKind::Onesided,
        }
    }
}

/// A validated dataset entry.
#[derive(Debug, Clone)]
pub struct DatasetPlan {
    pub name: String,
    pub path: PathBuf,
    pub rater: RaterPlan,
}

impl EvalConfig {
    /// Load `configs/evals.yaml`. A missing file is an error.
    pub fn load(loader: &ConfigLoader) -> Result<Self, EvalError> {
        Ok(read_required(&loader.evals_path(), "Eval config")?)
    }

    /// Validate every entry and resolve dataset paths and judge prompts.
    ///
    /// Judge templates are read from `prompts/evals.yaml` only when a
    /// onesided dataset is configured. `concurrency` caps judge calls.
    pub fn plan(
        &self,
        loader: &ConfigLoader,
        concurrency: usize,
    ) -> Result<Vec<DatasetPlan>, EvalError> {
        let mut kinds = Vec::with_capacity(self.datasets.len());
        for (name, entry) in &self.datasets {
            let kind = RaterKind::parse(&entry.rater).ok_or_else(|| EvalError::UnknownRater {
                dataset: name.clone(),
                rater: entry.rater.clone(),
            })?;
            if kind == RaterKind::Onesided
                && entry.dimensions.as_ref().map_or(true, IndexMap::is_empty)
            {
                return Err(EvalError::MissingDimensions(name.clone()));
            }
            kinds.push(kind);
        }

        let mut prompts: Option<HashMap<String, String>> = None;
        if kinds.contains(&RaterKind::Onesided) {
            prompts = Some(read_required(&loader.eval_prompts_path(), "Judge prompts")?);
        }

        let mut plans = Vec::with_capacity(self.datasets.len());
        for ((name, entry), kind) in self.datasets.iter().zip(kinds) {
            let rater = match kind {
                RaterKind::Trajectory => RaterPlan::Trajectory,
                RaterKind::Onesided => {
                    let template = prompts
                        .as_ref()
                        .and_then(|p| p.get(ONESIDED_PROMPT))
                        .cloned()
                        .ok_or_else(|| EvalError::MissingPrompt(ONESIDED_PROMPT.to_string()))?;

                    let mut judge = JudgeConfig::default().with_concurrency(concurrency);
                    if let Some(model) = &entry.judge_model {
                        judge = judge.with_model(model);
                    }
                    if let Some(max_tokens) = entry.judge_max_tokens {
                        judge = judge.with_max_tokens(max_tokens);
                    }

                    RaterPlan::Onesided {
                        dimensions: entry.dimensions.clone().unwrap_or_default(),
                        judge,
                        template,
                    }
                }
            };

            plans.push(DatasetPlan {
                name: name.clone(),
                path: loader.resolve(&entry.path),
                rater,
            });
        }

        Ok(plans)
    }
}

/// Default concurrency for both agent runs and judge calls.
pub fn default_concurrency() -> usize {
    MAX_EVAL_CONCURRENCY
}
