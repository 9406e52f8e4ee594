//! Planner error types.

use crate::validate::PlanIssue;

/// Unified error type for plan creation and execution.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The assembled plan failed validation; the issues list carries every
    /// error found (cycles, dangling dependencies, unknown tools).
    #[error("plan validation failed: {}", summarize(.errors))]
    ValidationFailed { errors: Vec<PlanIssue> },

    /// A step failed and the recovery policy chose to abort. Rollback was
    /// attempted (best-effort) before this was raised.
    #[error("plan aborted at step `{step_id}`: {reason}")]
    Aborted { step_id: String, reason: String },
}

fn summarize(issues: &[PlanIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias used throughout the planner crate.
pub type Result<T> = std::result::Result<T, PlanError>;
