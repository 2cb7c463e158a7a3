//! Indicatif progress display for eval runs.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use wikiq_eval::EvalProgress;

/// One progress bar, reset per dataset side.
pub struct EvalProgressBar {
    bar: ProgressBar,
}

impl EvalProgressBar {
    pub fn new() -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .context("Invalid progress template")?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }

    pub fn handle(&self, event: EvalProgress) {
        match event {
            EvalProgress::DatasetStarted {
                dataset,
                rater,
                items,
            } => {
                self.bar.reset();
                self.bar.set_length(items as u64);
                self.bar.set_message(format!("{} ({})", dataset, rater));
            }
            EvalProgress::ItemCompleted {
                dataset,
                side,
                completed,
                total,
            } => {
                if completed == 1 {
                    self.bar.reset();
                    self.bar.set_length(total as u64);
                }
                self.bar.set_position(completed as u64);
                self.bar.set_message(format!("{} [{}]", dataset, side));
            }
            EvalProgress::JudgingStarted { dataset, side } => {
                self.bar.set_message(format!("{} [{}] judging...", dataset, side));
            }
            EvalProgress::ReportWritten { .. } => {
                self.bar.finish_with_message("Complete");
            }
            _ => {} // Handle future variants gracefully
        }
    }

    /// Clear the bar after a failed run.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
