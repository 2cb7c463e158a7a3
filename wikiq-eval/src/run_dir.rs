//! On-disk layout of one eval run.
//!
//! ```text
//! eval_outputs/<run_id>/
//!   transcripts_base/<dataset>.json
//!   transcripts_test/<dataset>.json
//!   judge_outputs/<dataset>_<side>.json
//!   report.md
//! ```
//!
//! Every file is written as soon as its content is known, so an interrupted
//! run keeps whatever finished. Reports are always rebuilt from the judge
//! outputs found on disk.

use crate::dataset::DatasetItem;
use crate::error::EvalError;
use crate::onesided::OnesidedResult;
use crate::trajectory::{TrajectoryItem, TrajectoryMetrics, TrajectoryResult};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use wikiq_core::{AgentResult, Message, ToolCallRecord};

/// Timestamp format for generated run ids (local time).
pub const RUN_ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const JUDGE_OUTPUTS_DIR: &str = "judge_outputs";
const REPORT_FILE: &str = "report.md";

/// Which agent configuration produced an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Base,
    Test,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Base => "base",
            Side::Test => "test",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One agent run as persisted in a transcripts file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub query: String,
    pub dataset_item: DatasetItem,
    pub final_text: String,
    pub turn_count: u32,
    pub tool_calls_made: Vec<ToolCallRecord>,
    pub messages: Vec<Message>,
}

impl TranscriptRecord {
    pub fn new(item: &DatasetItem, result: &AgentResult) -> Self {
        Self {
            query: item.query().to_string(),
            dataset_item: item.clone(),
            final_text: result.final_text.clone(),
            turn_count: result.turn_count,
            tool_calls_made: result.tool_calls_made.clone(),
            messages: result.messages.clone(),
        }
    }
}

/// Persisted trajectory rating for one dataset side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryOutput {
    pub dataset: String,
    pub side: Side,
    pub metrics: TrajectoryMetrics,
    pub items: Vec<TrajectoryItem>,
}

/// One judged item as persisted. The response and context are already in
/// the transcripts file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnesidedOutputItem {
    pub query: String,
    pub scores: IndexMap<String, i64>,
    pub explanation: String,
}

/// Persisted rubric rating for one dataset side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnesidedOutput {
    pub dataset: String,
    pub side: Side,
    pub dimensions: Vec<String>,
    pub mean_scores: IndexMap<String, f64>,
    pub items: Vec<OnesidedOutputItem>,
}

/// Any judge output file. Distinguished by shape: trajectory outputs carry
/// `metrics`, rubric outputs carry `dimensions` and `mean_scores`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JudgeOutput {
    Trajectory(TrajectoryOutput),
    Onesided(OnesidedOutput),
}

impl JudgeOutput {
    pub fn trajectory(dataset: &str, side: Side, result: &TrajectoryResult) -> Self {
        JudgeOutput::Trajectory(TrajectoryOutput {
            dataset: dataset.to_string(),
            side,
            metrics: result.metrics,
            items: result.items.clone(),
        })
    }

    pub fn onesided(side: Side, result: &OnesidedResult) -> Self {
        JudgeOutput::Onesided(OnesidedOutput {
            dataset: result.dataset_name.clone(),
            side,
            dimensions: result.dimensions.clone(),
            mean_scores: result.mean_scores.clone(),
            items: result
                .items
                .iter()
                .map(|item| OnesidedOutputItem {
                    query: item.query.clone(),
                    scores: item.scores.clone(),
                    explanation: item.explanation.clone(),
                })
                .collect(),
        })
    }

    pub fn dataset(&self) -> &str {
        match self {
            JudgeOutput::Trajectory(out) => &out.dataset,
            JudgeOutput::Onesided(out) => &out.dataset,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            JudgeOutput::Trajectory(out) => out.side,
            JudgeOutput::Onesided(out) => out.side,
        }
    }

    /// File name under `judge_outputs/`.
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.dataset(), self.side())
    }
}

/// A run directory under `eval_outputs/`.
#[derive(Debug, Clone)]
pub struct RunDir {
    path: PathBuf,
}

impl RunDir {
    /// Create (or reopen) a run directory.
    ///
    /// With `run_id`, the directory `<outputs_dir>/<run_id>` is reused if it
    /// exists. Without, a new id is generated from the local time.
    pub fn create(outputs_dir: &Path, run_id: Option<&str>) -> Result<Self, EvalError> {
        let id = match run_id {
            Some(id) => id.to_string(),
            None => chrono::Local::now().format(RUN_ID_FORMAT).to_string(),
        };
        let path = outputs_dir.join(id);
        let resumed = path.is_dir();
        fs::create_dir_all(&path).map_err(|e| EvalError::io(&path, e))?;

        if resumed {
            log::info!("Resuming run in {}", path.display());
        } else {
            log::info!("Created run directory {}", path.display());
        }
        Ok(Self { path })
    }

    /// Open an existing directory without creating anything.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn transcripts_path(&self, side: Side, dataset: &str) -> PathBuf {
        self.path
            .join(format!("transcripts_{}", side))
            .join(format!("{}.json", dataset))
    }

    pub fn judge_outputs_dir(&self) -> PathBuf {
        self.path.join(JUDGE_OUTPUTS_DIR)
    }

    pub fn report_path(&self) -> PathBuf {
        self.path.join(REPORT_FILE)
    }

    pub fn write_transcripts(
        &self,
        side: Side,
        dataset: &str,
        records: &[TranscriptRecord],
    ) -> Result<PathBuf, EvalError> {
        let path = self.transcripts_path(side, dataset);
        write_json(&path, &records)?;
        log::info!("Saved {} transcripts to {}", records.len(), path.display());
        Ok(path)
    }

    pub fn write_judge_output(&self, output: &JudgeOutput) -> Result<PathBuf, EvalError> {
        let path = self.judge_outputs_dir().join(output.file_name());
        write_json(&path, output)?;
        log::info!("Saved judge output to {}", path.display());
        Ok(path)
    }

    /// Read every `judge_outputs/*.json`, sorted by file name.
    ///
    /// A missing directory means no outputs. A file that fails to parse is
    /// an error, so a report never silently drops a dataset.
    pub fn load_judge_outputs(&self) -> Result<Vec<JudgeOutput>, EvalError> {
        let dir = self.judge_outputs_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| EvalError::io(&dir, e))? {
            let path = entry.map_err(|e| EvalError::io(&dir, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let outputs = paths
            .iter()
            .map(|path| read_json(path))
            .collect::<Result<Vec<JudgeOutput>, _>>()?;
        log::debug!("Loaded {} judge outputs from {}", outputs.len(), dir.display());
        Ok(outputs)
    }

    pub fn write_report(&self, contents: &str) -> Result<PathBuf, EvalError> {
        let path = self.report_path();
        fs::write(&path, contents).map_err(|e| EvalError::io(&path, e))?;
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), EvalError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| EvalError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|e| EvalError::io(path, e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, EvalError> {
    let contents = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    serde_json::from_str(&contents).map_err(|source| EvalError::Serialize {
        path: path.to_path_buf(),
        source,
    })
}
