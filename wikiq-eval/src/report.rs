//! Report aggregation and rendering.
//!
//! Reports are built only from judge outputs read back from a run
//! directory, never from in-memory results, so a resumed run reports on
//! everything persisted so far.

use crate::error::EvalError;
use crate::run_dir::{JudgeOutput, OnesidedOutput, Side, TrajectoryOutput};
use crate::trajectory::TrajectoryMetrics;
use indexmap::IndexMap;
use wikiq_core::format_template;

/// Timestamp format shown in reports (local time).
pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Placeholder text for a table with no data.
pub const EMPTY_TABLE: &str = "N/A";

const MISSING_CELL: &str = "-";

/// Template used when the project has no `eval_outputs/TEMPLATE.md`.
pub const DEFAULT_TEMPLATE: &str = "# Eval Report

**Generated:** {timestamp}
**Base agent:** `{base_agent}`
{test_agent_line}

## Tool Triggering (Trajectory)

{trajectory_table}

## Response Quality (Rubric)

{rubric_table}
";

/// Base and test outputs for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SidePair<T> {
    pub dataset: String,
    pub base: Option<T>,
    pub test: Option<T>,
}

impl<T> SidePair<T> {
    fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            base: None,
            test: None,
        }
    }

    fn set(&mut self, side: Side, output: T) {
        match side {
            Side::Base => self.base = Some(output),
            Side::Test => self.test = Some(output),
        }
    }
}

/// Judge outputs grouped by rater and dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportData {
    pub trajectory: Vec<SidePair<TrajectoryOutput>>,
    pub rubric: Vec<SidePair<OnesidedOutput>>,
}

/// Group judge outputs by dataset.
///
/// Datasets named in `preferred_order` come first in that order; any others
/// (from earlier runs into the same directory) follow in input order.
pub fn aggregate(outputs: Vec<JudgeOutput>, preferred_order: &[String]) -> ReportData {
    let mut trajectory: IndexMap<String, SidePair<TrajectoryOutput>> = IndexMap::new();
    let mut rubric: IndexMap<String, SidePair<OnesidedOutput>> = IndexMap::new();

    for output in outputs {
        match output {
            JudgeOutput::Trajectory(out) => trajectory
                .entry(out.dataset.clone())
                .or_insert_with(|| SidePair::new(&out.dataset))
                .set(out.side, out),
            JudgeOutput::Onesided(out) => rubric
                .entry(out.dataset.clone())
                .or_insert_with(|| SidePair::new(&out.dataset))
                .set(out.side, out),
        }
    }

    let rank = |name: &str| {
        preferred_order
            .iter()
            .position(|preferred| preferred == name)
            .unwrap_or(usize::MAX)
    };
    trajectory.sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));
    rubric.sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));

    ReportData {
        trajectory: trajectory.into_values().collect(),
        rubric: rubric.into_values().collect(),
    }
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn metric_rows(metrics: Option<&TrajectoryMetrics>) -> [String; 4] {
    match metrics {
        Some(m) => [
            percent(m.accuracy),
            percent(m.precision),
            percent(m.recall),
            percent(m.f1),
        ],
        None => std::array::from_fn(|_| MISSING_CELL.to_string()),
    }
}

/// Markdown tables for trajectory datasets, or `N/A`.
pub fn trajectory_table(pairs: &[SidePair<TrajectoryOutput>]) -> String {
    if pairs.is_empty() {
        return EMPTY_TABLE.to_string();
    }

    let labels = ["Accuracy", "Precision", "Recall", "F1"];
    let sections: Vec<String> = pairs
        .iter()
        .map(|pair| {
            let base = metric_rows(pair.base.as_ref().map(|o| &o.metrics));
            let mut lines = vec![format!("### {}", pair.dataset), String::new()];

            if pair.test.is_some() {
                let test = metric_rows(pair.test.as_ref().map(|o| &o.metrics));
                lines.push("| Metric | Base | Test |".to_string());
                lines.push("|--------|------|------|".to_string());
                for ((label, b), t) in labels.iter().zip(&base).zip(&test) {
                    lines.push(format!("| {} | {} | {} |", label, b, t));
                }
            } else {
                lines.push("| Metric | Value |".to_string());
                lines.push("|--------|-------|".to_string());
                for (label, b) in labels.iter().zip(&base) {
                    lines.push(format!("| {} | {} |", label, b));
                }
            }
            lines.join("\n")
        })
        .collect();

    sections.join("\n\n")
}

fn mean_cell(output: Option<&OnesidedOutput>, dimension: &str) -> String {
    match output {
        Some(out) => format!("{:.2}", out.mean_scores.get(dimension).copied().unwrap_or(0.0)),
        None => MISSING_CELL.to_string(),
    }
}

/// Markdown tables for rubric datasets, or `N/A`.
///
/// Rows follow the base side's dimension order, falling back to the test
/// side when only test output exists.
pub fn rubric_table(pairs: &[SidePair<OnesidedOutput>]) -> String {
    if pairs.is_empty() {
        return EMPTY_TABLE.to_string();
    }

    let sections: Vec<String> = pairs
        .iter()
        .map(|pair| {
            let dimensions = pair
                .base
                .as_ref()
                .or(pair.test.as_ref())
                .map(|o| o.dimensions.as_slice())
                .unwrap_or_default();
            let mut lines = vec![format!("### {}", pair.dataset), String::new()];

            if pair.test.is_some() {
                lines.push("| Dimension | Base | Test |".to_string());
                lines.push("|-----------|------|------|".to_string());
                for dim in dimensions {
                    lines.push(format!(
                        "| {} | {} | {} |",
                        dim,
                        mean_cell(pair.base.as_ref(), dim),
                        mean_cell(pair.test.as_ref(), dim)
                    ));
                }
            } else {
                lines.push("| Dimension | Mean |".to_string());
                lines.push("|-----------|------|".to_string());
                for dim in dimensions {
                    lines.push(format!("| {} | {} |", dim, mean_cell(pair.base.as_ref(), dim)));
                }
            }
            lines.join("\n")
        })
        .collect();

    sections.join("\n\n")
}

/// Fill a report template.
///
/// # Errors
///
/// `EvalError::Config` if the template uses a placeholder other than
/// `timestamp`, `base_agent`, `test_agent_line`, `trajectory_table` and
/// `rubric_table`.
pub fn render_report(
    template: &str,
    timestamp: &str,
    base_agent: &str,
    test_agent: Option<&str>,
    data: &ReportData,
) -> Result<String, EvalError> {
    let test_agent_line = test_agent
        .map(|name| format!("**Test agent:** `{}`", name))
        .unwrap_or_default();
    let trajectory = trajectory_table(&data.trajectory);
    let rubric = rubric_table(&data.rubric);

    Ok(format_template(
        template,
        &[
            ("timestamp", timestamp),
            ("base_agent", base_agent),
            ("test_agent_line", &test_agent_line),
            ("trajectory_table", &trajectory),
            ("rubric_table", &rubric),
        ],
    )?)
}
