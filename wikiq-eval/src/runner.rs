//! Eval orchestration.
//!
//! The [`EvalRunner`] runs every configured dataset through the base agent
//! (and optionally a test agent), rates the transcripts, persists everything
//! into a run directory as it goes, and renders a report from what is on
//! disk.

use crate::config::{default_concurrency, EvalConfig, RaterKind, RaterPlan};
use crate::dataset::{load_dataset, DatasetItem};
use crate::error::EvalError;
use crate::onesided::OnesidedJudge;
use crate::pool::try_map_ordered;
use crate::report::{
    aggregate, render_report, ReportData, DEFAULT_TEMPLATE, REPORT_TIMESTAMP_FORMAT,
};
use crate::run_dir::{JudgeOutput, RunDir, Side, TranscriptRecord};
use crate::trajectory::TrajectoryRater;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wikiq_core::{AgentProfile, AgentResult, ConfigLoader, ModelClient, ToolAgent, ToolRegistry};

/// Progress events emitted during an eval run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum EvalProgress {
    /// A dataset was loaded and its agent runs are starting.
    DatasetStarted {
        dataset: String,
        rater: RaterKind,
        /// Number of items in the dataset.
        items: usize,
    },
    /// One agent run finished.
    ItemCompleted {
        dataset: String,
        side: Side,
        /// Runs finished so far for this dataset side.
        completed: usize,
        total: usize,
    },
    /// The rubric judge started on one dataset side.
    JudgingStarted { dataset: String, side: Side },
    /// The report was written.
    ReportWritten { path: PathBuf },
}

/// Runs evals for a project root.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use wikiq_core::{AnthropicProvider, ConfigLoader, LlmConfig, ModelClient, ToolRegistry};
/// use wikiq_eval::EvalRunner;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = LlmConfig::default();
/// let llm = ModelClient::new(Arc::new(AnthropicProvider::from_env(&config)?), config);
///
/// let runner = EvalRunner::new(
///     ConfigLoader::new("."),
///     Arc::new(llm),
///     Arc::new(ToolRegistry::new()),
/// );
/// let run_dir = runner.run("agent_v1", Some("agent_v2"), None).await?;
/// println!("{}", run_dir.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EvalRunner {
    loader: ConfigLoader,
    llm: Arc<ModelClient>,
    registry: Arc<ToolRegistry>,
    concurrency: usize,
}

impl EvalRunner {
    pub fn new(loader: ConfigLoader, llm: Arc<ModelClient>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            loader,
            llm,
            registry,
            concurrency: default_concurrency(),
        }
    }

    /// Cap on concurrent agent runs and judge calls (default: 2).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn loader(&self) -> &ConfigLoader {
        &self.loader
    }

    /// Run all configured evals and return the run directory.
    pub async fn run(
        &self,
        base_agent: &str,
        test_agent: Option<&str>,
        run_id: Option<&str>,
    ) -> Result<PathBuf, EvalError> {
        self.run_with_progress(base_agent, test_agent, run_id, |_| {})
            .await
    }

    /// Run all configured evals, reporting progress through `on_progress`.
    ///
    /// With `run_id`, an existing run directory is reopened: every configured
    /// dataset is recomputed and overwritten, and the report covers every
    /// judge output present in the directory.
    ///
    /// # Errors
    ///
    /// Configuration problems (unknown rater, missing dimensions or prompts,
    /// unknown agent names, a bad report template, a trajectory item without
    /// its expected flag) are reported before any agent runs. A model
    /// failure after retries, in an agent or in the judge, aborts the run;
    /// files already written stay on disk.
    pub async fn run_with_progress<F>(
        &self,
        base_agent: &str,
        test_agent: Option<&str>,
        run_id: Option<&str>,
        on_progress: F,
    ) -> Result<PathBuf, EvalError>
    where
        F: Fn(EvalProgress) + Send + Sync,
    {
        let plans = EvalConfig::load(&self.loader)?.plan(&self.loader, self.concurrency)?;

        let template = self.load_report_template()?;
        render_report(&template, "", base_agent, test_agent, &ReportData::default())?;

        let mut datasets = Vec::with_capacity(plans.len());
        for plan in &plans {
            let items = load_dataset(&plan.path)?;
            if let RaterPlan::Trajectory = plan.rater {
                TrajectoryRater::new().check_items(&items)?;
            }
            datasets.push(items);
        }

        let mut agents = vec![(Side::Base, self.load_agent(base_agent)?)];
        if let Some(name) = test_agent {
            agents.push((Side::Test, self.load_agent(name)?));
        }

        let run_dir = RunDir::create(&self.loader.eval_outputs_dir(), run_id)?;

        for (plan, items) in plans.iter().zip(&datasets) {
            log::info!(
                "Dataset '{}' ({} items, rater: {})",
                plan.name,
                items.len(),
                plan.rater.kind()
            );
            on_progress(EvalProgress::DatasetStarted {
                dataset: plan.name.clone(),
                rater: plan.rater.kind(),
                items: items.len(),
            });

            let mut side_results = Vec::with_capacity(agents.len());
            for (side, agent) in &agents {
                log::info!(
                    "Running {} agent '{}' on {}",
                    side,
                    agent.profile().name,
                    plan.name
                );
                let results = self
                    .run_side(agent, &plan.name, *side, items, &on_progress)
                    .await?;

                let pairs: Vec<(DatasetItem, AgentResult)> =
                    items.iter().cloned().zip(results).collect();
                let records: Vec<TranscriptRecord> = pairs
                    .iter()
                    .map(|(item, result)| TranscriptRecord::new(item, result))
                    .collect();
                run_dir.write_transcripts(*side, &plan.name, &records)?;
                side_results.push((*side, pairs));
            }

            for (side, pairs) in &side_results {
                let output = match &plan.rater {
                    RaterPlan::Trajectory => {
                        let result = TrajectoryRater::new().evaluate(pairs)?;
                        JudgeOutput::trajectory(&plan.name, *side, &result)
                    }
                    RaterPlan::Onesided {
                        dimensions,
                        judge,
                        template,
                    } => {
                        on_progress(EvalProgress::JudgingStarted {
                            dataset: plan.name.clone(),
                            side: *side,
                        });
                        let result = OnesidedJudge::new(Arc::clone(&self.llm), judge.clone())
                            .evaluate(&plan.name, pairs, dimensions, template)
                            .await?;
                        JudgeOutput::onesided(*side, &result)
                    }
                };
                run_dir.write_judge_output(&output)?;
            }
        }

        let dataset_order: Vec<String> = plans.iter().map(|plan| plan.name.clone()).collect();
        let data = aggregate(run_dir.load_judge_outputs()?, &dataset_order);

        let timestamp = chrono::Local::now()
            .format(REPORT_TIMESTAMP_FORMAT)
            .to_string();
        let report = render_report(&template, &timestamp, base_agent, test_agent, &data)?;
        let report_path = run_dir.write_report(&report)?;

        log::info!("Report written to {}", report_path.display());
        on_progress(EvalProgress::ReportWritten { path: report_path });

        Ok(run_dir.path().to_path_buf())
    }

    fn load_agent(&self, name: &str) -> Result<ToolAgent, EvalError> {
        let profile = AgentProfile::load(&self.loader, name, &self.registry)?;
        Ok(ToolAgent::new(profile, Arc::clone(&self.registry)))
    }

    /// `eval_outputs/TEMPLATE.md` if present, else the built-in template.
    fn load_report_template(&self) -> Result<String, EvalError> {
        let path = self.loader.report_template_path();
        if path.is_file() {
            std::fs::read_to_string(&path).map_err(|e| EvalError::io(&path, e))
        } else {
            log::debug!("No report template at {}, using default", path.display());
            Ok(DEFAULT_TEMPLATE.to_string())
        }
    }

    async fn run_side<F>(
        &self,
        agent: &ToolAgent,
        dataset: &str,
        side: Side,
        items: &[DatasetItem],
        on_progress: &F,
    ) -> Result<Vec<AgentResult>, EvalError>
    where
        F: Fn(EvalProgress) + Send + Sync,
    {
        let total = items.len();
        let completed = AtomicUsize::new(0);
        let llm = self.llm.as_ref();

        try_map_ordered(items.iter().collect(), self.concurrency, |_, item: &DatasetItem| {
            let completed = &completed;
            async move {
                let result = agent.run(item.query(), llm).await?;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                on_progress(EvalProgress::ItemCompleted {
                    dataset: dataset.to_string(),
                    side,
                    completed: done,
                    total,
                });
                Ok::<_, EvalError>(result)
            }
        })
        .await
    }
}
