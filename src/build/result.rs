//! Build result types.
//!
//! Contains types for representing the outcome of build operations.

use crate::build::StepKind;
use std::path::PathBuf;
use std::time::Duration;

/// Status of a single build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Step completed
    Success,
    /// Step hit a compile error; its output was left untouched
    Failed(String),
}

impl StepStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, StepStatus::Success)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, StepStatus::Failed(_))
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Success => write!(f, "success"),
            StepStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of running a single step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Step that ran
    pub kind: StepKind,
    /// Outcome
    pub status: StepStatus,
    /// Files written
    pub outputs: Vec<PathBuf>,
    /// Step duration
    pub duration: Duration,
}

impl StepResult {
    /// Create a successful result.
    pub fn success(kind: StepKind, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { kind, status: StepStatus::Success, outputs, duration }
    }

    /// Create a failed result.
    pub fn failed(kind: StepKind, error: String, duration: Duration) -> Self {
        Self { kind, status: StepStatus::Failed(error), outputs: vec![], duration }
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete plan run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each step, in plan order
    pub steps: Vec<StepResult>,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step result.
    pub fn add_result(&mut self, result: StepResult) {
        self.steps.push(result);
    }

    /// Kinds of the steps that ran, in order.
    pub fn kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }

    /// Get the result for a step kind, if it ran.
    pub fn step(&self, kind: StepKind) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    /// Get the number of successful steps.
    pub fn success_count(&self) -> usize {
        self.steps.iter().filter(|r| r.status.is_success()).count()
    }

    /// Get the number of failed steps.
    pub fn failed_count(&self) -> usize {
        self.steps.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if every step succeeded.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Get all outputs produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.steps.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// Get failed step results.
    pub fn failures(&self) -> Vec<&StepResult> {
        self.steps.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let failed = self.failed_count();
        let total = self.steps.len();
        let files = self.all_outputs().len();

        if failed > 0 {
            lines.push(format!(
                "Build finished with errors: {} of {} steps failed ({} files written) in {}",
                failed,
                total,
                files,
                format_duration(self.total_duration)
            ));
            for step in self.failures() {
                lines.push(format!("  - {}: {}", step.kind, step.status));
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} steps, {} files written in {}",
                total,
                files,
                format_duration(self.total_duration)
            ));
        }

        lines.join("\n")
    }
}

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
