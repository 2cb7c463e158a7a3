//! Trajectory rater: did the agent call the tool when it should have?
//!
//! Each dataset item carries a boolean saying whether the tracked tool is
//! expected to be called. The rater compares it against the agent's recorded
//! tool calls and reports binary classification metrics.

use crate::dataset::{DatasetError, DatasetItem};
use serde::{Deserialize, Serialize};
use wikiq_core::AgentResult;

pub const DEFAULT_TRACKED_TOOL: &str = "search_wikipedia";
pub const DEFAULT_EXPECTED_FIELD: &str = "wiki_tool_call_expected";

/// Per-item outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryItem {
    pub query: String,
    pub expected: bool,
    pub actual: bool,
    pub correct: bool,
}

/// Confusion matrix over (expected, actual) pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn record(&mut self, expected: bool, actual: bool) {
        match (expected, actual) {
            (true, true) => self.true_positive += 1,
            (false, true) => self.false_positive += 1,
            (true, false) => self.false_negative += 1,
            (false, false) => self.true_negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn metrics(&self) -> TrajectoryMetrics {
        let ratio = |num: usize, den: usize| {
            if den == 0 {
                0.0
            } else {
                num as f64 / den as f64
            }
        };

        let accuracy = ratio(self.true_positive + self.true_negative, self.total());
        let precision = ratio(self.true_positive, self.true_positive + self.false_positive);
        let recall = ratio(self.true_positive, self.true_positive + self.false_negative);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        TrajectoryMetrics {
            accuracy,
            precision,
            recall,
            f1,
        }
    }
}

/// Aggregate metrics, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Result of rating one dataset side.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryResult {
    pub items: Vec<TrajectoryItem>,
    pub counts: ConfusionCounts,
    pub metrics: TrajectoryMetrics,
}

/// Rates tool-triggering decisions.
#[derive(Debug, Clone)]
pub struct TrajectoryRater {
    tracked_tool: String,
    expected_field: String,
}

impl Default for TrajectoryRater {
    fn default() -> Self {
        Self {
            tracked_tool: DEFAULT_TRACKED_TOOL.to_string(),
            expected_field: DEFAULT_EXPECTED_FIELD.to_string(),
        }
    }
}

impl TrajectoryRater {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tracked_tool(mut self, tool: impl Into<String>) -> Self {
        self.tracked_tool = tool.into();
        self
    }

    #[must_use]
    pub fn with_expected_field(mut self, field: impl Into<String>) -> Self {
        self.expected_field = field.into();
        self
    }

    /// Check every item carries a boolean expected field.
    pub fn check_items(&self, items: &[DatasetItem]) -> Result<(), DatasetError> {
        for (index, item) in items.iter().enumerate() {
            item.require_bool(&self.expected_field, index)?;
        }
        Ok(())
    }

    /// Score `(item, result)` pairs.
    ///
    /// A missing or non-boolean expected field is an error naming the field
    /// and item index; it is never defaulted.
    pub fn evaluate(
        &self,
        pairs: &[(DatasetItem, AgentResult)],
    ) -> Result<TrajectoryResult, DatasetError> {
        let mut counts = ConfusionCounts::default();
        let mut items = Vec::with_capacity(pairs.len());

        for (index, (item, result)) in pairs.iter().enumerate() {
            let expected = item.require_bool(&self.expected_field, index)?;
            let actual = result.called_tool(&self.tracked_tool);
            counts.record(expected, actual);
            items.push(TrajectoryItem {
                query: item.query().to_string(),
                expected,
                actual,
                correct: expected == actual,
            });
        }

        let metrics = counts.metrics();
        log::info!(
            "Trajectory: {} items, accuracy {:.2}, f1 {:.2}",
            items.len(),
            metrics.accuracy,
            metrics.f1
        );

        Ok(TrajectoryResult {
            items,
            counts,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use wikiq_core::ToolCallRecord;

    fn pair(expected: bool, called: bool) -> (DatasetItem, AgentResult) {
        let item = DatasetItem::from_query(format!("q-{}-{}", expected, called))
            .with_field(DEFAULT_EXPECTED_FIELD, json!(expected));
        let tool_calls_made = if called {
            vec![ToolCallRecord {
                tool: DEFAULT_TRACKED_TOOL.to_string(),
                input: json!({"query": "x"}),
                output: "## X\nx".to_string(),
            }]
        } else {
            vec![]
        };
        let result = AgentResult {
            final_text: "answer".to_string(),
            messages: vec![],
            turn_count: 1,
            tool_calls_made,
        };
        (item, result)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[rstest]
    #[case::all_correct(vec![(true, true), (false, false)], 1.0, 1.0, 1.0, 1.0)]
    #[case::one_false_positive(vec![(true, true), (false, true), (false, false)], 2.0 / 3.0, 0.5, 1.0, 2.0 / 3.0)]
    #[case::never_calls(vec![(true, false), (true, false)], 0.0, 0.0, 0.0, 0.0)]
    #[case::only_negatives(vec![(false, false), (false, false)], 1.0, 0.0, 0.0, 0.0)]
    fn test_metrics(
        #[case] outcomes: Vec<(bool, bool)>,
        #[case] accuracy: f64,
        #[case] precision: f64,
        #[case] recall: f64,
        #[case] f1: f64,
    ) {
        let pairs: Vec<_> = outcomes.into_iter().map(|(e, a)| pair(e, a)).collect();
        let result = TrajectoryRater::new().evaluate(&pairs).unwrap();
        assert_close(result.metrics.accuracy, accuracy);
        assert_close(result.metrics.precision, precision);
        assert_close(result.metrics.recall, recall);
        assert_close(result.metrics.f1, f1);
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let result = TrajectoryRater::new().evaluate(&[]).unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.metrics, TrajectoryMetrics::default());
    }

    #[test]
    fn test_items_and_counts() {
        let pairs = vec![pair(true, true), pair(false, true), pair(true, false)];
        let result = TrajectoryRater::new().evaluate(&pairs).unwrap();

        assert_eq!(result.counts.true_positive, 1);
        assert_eq!(result.counts.false_positive, 1);
        assert_eq!(result.counts.false_negative, 1);
        assert_eq!(result.counts.true_negative, 0);
        assert!(result.items[0].correct);
        assert!(!result.items[1].correct);
        assert!(result.items[1].actual);
    }

    #[test]
    fn test_order_does_not_change_metrics() {
        let forward = vec![pair(true, true), pair(false, true), pair(false, false)];
        let mut reversed = forward.clone();
        reversed.reverse();

        let rater = TrajectoryRater::new();
        assert_eq!(
            rater.evaluate(&forward).unwrap().metrics,
            rater.evaluate(&reversed).unwrap().metrics
        );
    }

    #[test]
    fn test_other_tools_do_not_count() {
        let (item, mut result) = pair(true, false);
        result.tool_calls_made.push(ToolCallRecord {
            tool: "calculator".into(),
            input: json!({}),
            output: String::new(),
        });
        let out = TrajectoryRater::new().evaluate(&[(item, result)]).unwrap();
        assert!(!out.items[0].actual);
    }

    #[test]
    fn test_missing_expected_field_is_error() {
        let item = DatasetItem::from_query("no label");
        let (_, result) = pair(true, true);
        let err = TrajectoryRater::new()
            .evaluate(&[pair(true, true), (item, result)])
            .unwrap_err();
        assert!(matches!(
            err,
            DatasetError::MissingField { ref field, index: 1 } if field == DEFAULT_EXPECTED_FIELD
        ));
    }

    #[test]
    fn test_check_items_names_first_bad_item() {
        let rater = TrajectoryRater::new();
        let labelled = pair(true, true).0;
        assert!(rater.check_items(&[labelled.clone()]).is_ok());

        let unlabelled = DatasetItem::from_query("no label");
        let err = rater
            .check_items(&[labelled, unlabelled.clone(), unlabelled])
            .unwrap_err();
        assert!(matches!(err, DatasetError::MissingField { index: 1, .. }));
    }
}
