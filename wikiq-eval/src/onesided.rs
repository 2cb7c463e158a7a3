//! One-sided rubric judge.
//!
//! A second model scores each agent response on one or more named
//! dimensions, each on a 1-3 scale, given the query, the response and any
//! reference context from the dataset item. Judge calls run with bounded
//! concurrency and results keep dataset order.

use crate::dataset::DatasetItem;
use crate::error::EvalError;
use crate::pool::try_map_ordered;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use wikiq_core::{format_template, AgentResult, Message, ModelClient, ModelRequest};

pub const DEFAULT_JUDGE_MODEL: &str = "claude-haiku-4-5-20251001";
pub const DEFAULT_JUDGE_MAX_TOKENS: u32 = 1024;

/// Judge calls in flight at once.
pub const MAX_EVAL_CONCURRENCY: usize = 2;

pub const SCORE_MIN: i64 = 1;
pub const SCORE_MAX: i64 = 3;

/// Score given to a dimension the judge omitted or that could not be parsed.
pub const SCORE_DEFAULT: i64 = 2;

pub const PARSE_ERROR_MARKER: &str = "[PARSE ERROR]";
pub const NO_CONTEXT: &str = "No additional context.";

/// Dataset fields surfaced to the judge, with their labels.
const CONTEXT_FIELDS: [(&str, &str); 3] = [
    ("ground_truth", "Ground truth answer"),
    ("false_premise", "False premise in query"),
    ("ambiguous_entity", "Ambiguous entity"),
];

/// Configuration for the rubric judge.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct JudgeConfig {
    /// Model used for judging
    pub model: String,

    /// Max tokens for the judge reply
    pub max_tokens: u32,

    /// Concurrent judge calls
    pub concurrency: usize,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_JUDGE_MODEL.to_string(),
            max_tokens: DEFAULT_JUDGE_MAX_TOKENS,
            concurrency: MAX_EVAL_CONCURRENCY,
        }
    }
}

impl JudgeConfig {
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
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Judged response for one dataset item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnesidedItem {
    pub query: String,
    pub response: String,
    pub scores: IndexMap<String, i64>,
    pub explanation: String,
    pub context: String,
}

/// Judged responses for one dataset side.
#[derive(Debug, Clone, PartialEq)]
pub struct OnesidedResult {
    pub dataset_name: String,
    pub dimensions: Vec<String>,
    pub items: Vec<OnesidedItem>,
    pub mean_scores: IndexMap<String, f64>,
}

/// Labeled reference lines for the judge, or [`NO_CONTEXT`].
pub fn build_context(item: &DatasetItem) -> String {
    let lines: Vec<String> = CONTEXT_FIELDS
        .iter()
        .filter_map(|(field, label)| {
            item.get_text(field)
                .map(|value| format!("{}: {}", label, value))
        })
        .collect();

    if lines.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        lines.join("\n")
    }
}

/// Rubric section of the prompt: `### name` followed by the trimmed rubric.
pub fn format_dimensions(dimensions: &IndexMap<String, String>) -> String {
    dimensions
        .iter()
        .map(|(name, rubric)| format!("### {}\n{}", name, rubric.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Key hint for the expected JSON, e.g. `"correctness": N, "tone": N`.
pub fn format_score_keys(dimensions: &IndexMap<String, String>) -> String {
    dimensions
        .keys()
        .map(|name| format!("\"{}\": N", name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fill the judge template for one item.
pub fn build_prompt(
    template: &str,
    dimensions: &IndexMap<String, String>,
    query: &str,
    context: &str,
    response: &str,
) -> Result<String, EvalError> {
    let dimensions_text = format_dimensions(dimensions);
    let score_keys = format_score_keys(dimensions);
    let prompt = format_template(
        template,
        &[
            ("dimensions", dimensions_text.as_str()),
            ("query", query),
            ("context", context),
            ("response", response),
            ("score_keys", score_keys.as_str()),
        ],
    )?;
    Ok(prompt)
}

/// Coerce a JSON score to an integer the way a lenient reader would.
fn coerce_score(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_scores_strict<'a>(
    reply: &str,
    dimensions: impl Iterator<Item = &'a String>,
) -> Option<(IndexMap<String, i64>, String)> {
    static JSON_OBJECT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid JSON object regex"));

    let json_text = JSON_OBJECT_RE.find(reply)?.as_str();
    let data: Value = serde_json::from_str(json_text).ok()?;

    let raw_scores = match data.get("scores") {
        None => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => return None,
    };

    let mut scores = IndexMap::new();
    for dim in dimensions {
        let score = match raw_scores.and_then(|map| map.get(dim)) {
            Some(value) => coerce_score(value)?,
            None => SCORE_DEFAULT,
        };
        scores.insert(dim.clone(), score.clamp(SCORE_MIN, SCORE_MAX));
    }

    let explanation = ["reasoning", "explanation"]
        .iter()
        .find_map(|key| data.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    Some((scores, explanation))
}

/// Parse a judge reply into per-dimension scores and an explanation.
///
/// The span from the first `{` to the last `}` is read as JSON. Scores are
/// clamped to 1-3 and a missing dimension scores 2. If the reply has no
/// usable JSON, every dimension scores 2 and the explanation is the raw reply
/// prefixed with [`PARSE_ERROR_MARKER`].
pub fn parse_scores(
    reply: &str,
    dimensions: &IndexMap<String, String>,
) -> (IndexMap<String, i64>, String) {
    parse_scores_strict(reply, dimensions.keys()).unwrap_or_else(|| {
        log::warn!("Could not parse judge reply, using default scores");
        let scores = dimensions
            .keys()
            .map(|dim| (dim.clone(), SCORE_DEFAULT))
            .collect();
        (scores, format!("{} {}", PARSE_ERROR_MARKER, reply))
    })
}

/// Mean score per dimension over `items` (0.0 when there are none).
pub fn mean_scores(dimensions: &[String], items: &[OnesidedItem]) -> IndexMap<String, f64> {
    dimensions
        .iter()
        .map(|dim| {
            let values: Vec<i64> = items
                .iter()
                .filter_map(|item| item.scores.get(dim).copied())
                .collect();
            let mean = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<i64>() as f64 / values.len() as f64
            };
            (dim.clone(), mean)
        })
        .collect()
}

/// LLM-as-judge rater over rubric dimensions.
#[derive(Debug, Clone)]
pub struct OnesidedJudge {
    llm: Arc<ModelClient>,
    config: JudgeConfig,
}

impl OnesidedJudge {
    pub fn new(llm: Arc<ModelClient>, config: JudgeConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// Judge every `(item, result)` pair.
    ///
    /// # Errors
    ///
    /// - `EvalError::Config` if the template has an unknown placeholder
    /// - `EvalError::Llm` if a judge call fails after retries
    ///
    /// Unparseable judge replies are not errors; see [`parse_scores`].
    pub async fn evaluate(
        &self,
        dataset_name: &str,
        pairs: &[(DatasetItem, AgentResult)],
        dimensions: &IndexMap<String, String>,
        prompt_template: &str,
    ) -> Result<OnesidedResult, EvalError> {
        // Render every prompt first so template errors surface before any call
        let jobs = pairs
            .iter()
            .map(|(item, result)| {
                let context = build_context(item);
                let prompt = build_prompt(
                    prompt_template,
                    dimensions,
                    item.query(),
                    &context,
                    &result.final_text,
                )?;
                Ok((item.query().to_string(), result.final_text.clone(), context, prompt))
            })
            .collect::<Result<Vec<_>, EvalError>>()?;

        log::info!(
            "Judging {} responses for '{}' with {} (concurrency {})",
            jobs.len(),
            dataset_name,
            self.config.model,
            self.config.concurrency
        );

        let items = try_map_ordered(
            jobs,
            self.config.concurrency,
            |_, (query, response, context, prompt)| async move {
                let request = ModelRequest::new(
                    &self.config.model,
                    self.config.max_tokens,
                    vec![Message::user(prompt)],
                );
                let reply = self.llm.create(&request).await?;
                let (scores, explanation) = parse_scores(&reply.text(), dimensions);
                Ok::<_, EvalError>(OnesidedItem {
                    query,
                    response,
                    scores,
                    explanation,
                    context,
                })
            },
        )
        .await?;

        let dimension_names: Vec<String> = dimensions.keys().cloned().collect();
        let mean_scores = mean_scores(&dimension_names, &items);

        Ok(OnesidedResult {
            dataset_name: dataset_name.to_string(),
            dimensions: dimension_names,
            items,
            mean_scores,
        })
    }
}
