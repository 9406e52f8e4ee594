//! Multi-step planning for the stockmind core.
//!
//! The planner turns a free-text intent into a validated, dependency-checked
//! [`ExecutionPlan`] and drives it through the tool executor with retry,
//! skip, rollback and abort recovery.

pub mod error;
pub mod intent;
pub mod plan;
pub mod planner;
pub mod validate;

pub use error::{PlanError, Result};
pub use intent::{Complexity, Intent, IntentAnalysis, analyze_intent};
pub use plan::{
    CompletedStep, ExecutionPlan, FailedStep, PlanExecutionResult, PlanMetadata, PlanStep,
    RecoveryAction, RetryPolicy, StepError,
};
pub use planner::{Planner, decompose};
pub use validate::{IssueCode, PlanIssue, ValidationReport, validate_plan};
