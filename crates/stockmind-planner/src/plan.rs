//! Plan data model.
//!
//! An [`ExecutionPlan`] is a validated, dependency-annotated sequence of
//! [`PlanStep`]s decomposed from a natural-language intent, plus the rollback
//! steps to undo its tool-bound work. Plans are immutable once created;
//! there is no partial-plan mutation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::intent::{Complexity, IntentAnalysis};

/// Default estimate for a step whose cost is unknown.
pub const DEFAULT_STEP_ESTIMATE_MS: u64 = 5_000;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Retry behavior for a failing step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Re-attempts after the first failure (0 = fail immediately).
    pub max_retries: u32,
    /// Delay between attempts.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff_ms: 1_000,
        }
    }
}

/// One unit of plan work, optionally bound to a tool.
///
/// Steps are immutable once their plan is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Step id, unique within its plan (e.g. `"check_permissions"`).
    pub id: String,
    /// Human-readable description of what the step does.
    pub description: String,
    /// Tool to invoke; `None` marks a bookkeeping step that trivially
    /// succeeds.
    pub tool_name: Option<String>,
    /// Arguments passed to the tool.
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    /// Ids of steps that must complete before this one.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Estimated duration in milliseconds.
    pub estimated_duration_ms: u64,
    /// Scheduling priority, 1 (highest) to 10.
    pub priority: u8,
    pub retry_policy: RetryPolicy,
}

impl PlanStep {
    /// Create a step with default estimate and retry policy.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        tool_name: Option<String>,
        dependencies: Vec<String>,
        priority: u8,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            tool_name,
            parameters: HashMap::new(),
            dependencies,
            estimated_duration_ms: DEFAULT_STEP_ESTIMATE_MS,
            priority,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Builder: set tool arguments.
    pub fn with_parameters(mut self, parameters: HashMap<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Builder: override the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Snapshot of the analysis that produced a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub analysis: IntentAnalysis,
    pub complexity: Complexity,
}

/// A validated, immutable execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub id: Uuid,
    /// Session the plan was created for.
    pub session_id: Uuid,
    /// The originating free-text intent.
    pub intent: String,
    /// Ordered steps; the decomposition templates emit them already sorted
    /// by dependency.
    pub steps: Vec<PlanStep>,
    pub created_at: DateTime<Utc>,
    /// Sum of the step estimates.
    pub estimated_total_duration_ms: u64,
    /// Undo steps, one per tool-bound step, generated in reverse step order.
    pub rollback_steps: Vec<PlanStep>,
    pub metadata: PlanMetadata,
}

// ---------------------------------------------------------------------------
// Execution results
// ---------------------------------------------------------------------------

/// A step that finished successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedStep {
    pub step_id: String,
    /// Tool payload, or the trivial marker for tool-less steps.
    pub result: Option<Value>,
    pub duration_ms: u64,
}

/// Failure detail for one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepError {
    /// Machine-readable code (mirrors the executor's error codes).
    pub code: String,
    pub message: String,
}

/// A step that exhausted its retries and failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedStep {
    pub step_id: String,
    pub error: StepError,
    /// Attempts beyond the first.
    pub retry_count: u32,
}

/// Outcome summary of one plan execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanExecutionResult {
    pub plan_id: Uuid,
    /// True only when no step failed.
    pub success: bool,
    pub completed_steps: Vec<CompletedStep>,
    pub failed_steps: Vec<FailedStep>,
    pub total_duration_ms: u64,
    /// Whether the rollback sequence ran.
    pub rollback_executed: bool,
}

/// Policy choice applied when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Re-attempt the step (handled by the per-step retry policy before
    /// failure classification ever runs).
    Retry,
    /// Record the failure and continue with the next step.
    Skip,
    /// Undo completed tool work, then stop.
    Rollback,
    /// Undo best-effort, then raise the failure to the caller.
    Abort,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
