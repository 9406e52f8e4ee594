//! Plan creation and execution.
//!
//! [`Planner::create_plan`] turns a free-text intent into a validated
//! [`ExecutionPlan`] via rule-based analysis and fixed decomposition
//! templates. [`Planner::execute_plan`] drives a plan through the tool
//! executor with per-step retries and a recovery policy (skip, rollback or
//! abort) on failure.

use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use stockmind_tools::{ExecuteOptions, ExecutionContext, ToolExecutor, ToolRegistry};

use crate::error::{PlanError, Result};
use crate::intent::{Intent, IntentAnalysis, analyze_intent};
use crate::plan::{
    CompletedStep, ExecutionPlan, FailedStep, PlanExecutionResult, PlanMetadata, PlanStep,
    RecoveryAction, StepError,
};
use crate::validate::validate_plan;

/// Deadline for each tool-bound step.
const STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates and executes multi-step plans against a tool registry.
///
/// Constructed explicitly with its registry; there is no ambient singleton.
#[derive(Clone)]
pub struct Planner {
    registry: ToolRegistry,
}

impl Planner {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    // -- creation -----------------------------------------------------------

    /// Create a validated execution plan from a free-text intent.
    ///
    /// Fails with [`PlanError::ValidationFailed`] when the assembled plan
    /// has cycles, dangling dependencies or tools missing from the registry.
    pub fn create_plan(&self, intent_text: &str, session_id: Uuid) -> Result<ExecutionPlan> {
        let analysis = analyze_intent(intent_text);
        let steps = decompose(&analysis);
        let rollback_steps = generate_rollback_steps(&steps);

        let plan = ExecutionPlan {
            id: Uuid::now_v7(),
            session_id,
            intent: intent_text.to_string(),
            estimated_total_duration_ms: steps.iter().map(|s| s.estimated_duration_ms).sum(),
            steps,
            created_at: Utc::now(),
            rollback_steps,
            metadata: PlanMetadata {
                complexity: analysis.complexity,
                analysis,
            },
        };

        let report = validate_plan(&plan, &self.registry);
        for warning in &report.warnings {
            tracing::warn!(
                plan_id = %plan.id,
                step_id = warning.step_id.as_deref().unwrap_or(""),
                code = ?warning.code,
                "plan validation warning"
            );
        }
        if !report.is_valid() {
            return Err(PlanError::ValidationFailed {
                errors: report.errors,
            });
        }

        tracing::info!(
            plan_id = %plan.id,
            intent = %plan.metadata.analysis.primary_intent,
            step_count = plan.steps.len(),
            "plan created"
        );
        Ok(plan)
    }

    // -- execution ----------------------------------------------------------

    /// Execute a plan's steps strictly in list order.
    ///
    /// Order contract: plans come from the decomposition templates, which
    /// emit steps already sorted by dependency; the executor does not
    /// re-derive a topological order. Validation has already rejected cycles
    /// and dangling references.
    ///
    /// Failure handling per step, after the retry policy is exhausted:
    /// steps whose id marks them as precondition checks trigger a rollback
    /// and stop the plan; verification/logging steps are skipped; anything
    /// else aborts, raising [`PlanError::Aborted`] after a best-effort
    /// rollback. In every other case the method returns a
    /// [`PlanExecutionResult`] rather than an error.
    pub async fn execute_plan(
        &self,
        plan: &ExecutionPlan,
        executor: &ToolExecutor,
        context: &ExecutionContext,
    ) -> Result<PlanExecutionResult> {
        let start = Instant::now();
        let mut completed_steps: Vec<CompletedStep> = Vec::new();
        let mut failed_steps: Vec<FailedStep> = Vec::new();
        let mut rollback_executed = false;

        for step in &plan.steps {
            let step_start = Instant::now();

            match self.execute_step_with_retries(step, executor, context).await {
                Ok(result) => {
                    completed_steps.push(CompletedStep {
                        step_id: step.id.clone(),
                        result,
                        duration_ms: step_start.elapsed().as_millis() as u64,
                    });
                }
                Err((error, retry_count)) => {
                    tracing::warn!(
                        plan_id = %plan.id,
                        step_id = %step.id,
                        code = %error.code,
                        retries = retry_count,
                        "plan step failed"
                    );
                    failed_steps.push(FailedStep {
                        step_id: step.id.clone(),
                        error: error.clone(),
                        retry_count,
                    });

                    match handle_step_failure(step) {
                        RecoveryAction::Skip => continue,
                        RecoveryAction::Rollback => {
                            self.execute_rollback(plan, executor, context).await;
                            rollback_executed = true;
                            break;
                        }
                        RecoveryAction::Abort | RecoveryAction::Retry => {
                            if !rollback_executed {
                                self.execute_rollback(plan, executor, context).await;
                            }
                            return Err(PlanError::Aborted {
                                step_id: step.id.clone(),
                                reason: error.message,
                            });
                        }
                    }
                }
            }
        }

        let result = PlanExecutionResult {
            plan_id: plan.id,
            success: failed_steps.is_empty(),
            completed_steps,
            failed_steps,
            total_duration_ms: start.elapsed().as_millis() as u64,
            rollback_executed,
        };

        tracing::info!(
            plan_id = %plan.id,
            success = result.success,
            completed = result.completed_steps.len(),
            failed = result.failed_steps.len(),
            rollback = result.rollback_executed,
            "plan execution finished"
        );
        Ok(result)
    }

    /// Execute one step, re-attempting transient failures per its policy.
    ///
    /// Returns the payload on success, or the final error plus the number of
    /// re-attempts made.
    async fn execute_step_with_retries(
        &self,
        step: &PlanStep,
        executor: &ToolExecutor,
        context: &ExecutionContext,
    ) -> std::result::Result<Option<Value>, (StepError, u32)> {
        let mut retry_count = 0u32;

        loop {
            match execute_step(step, executor, context).await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    let transient = matches!(
                        error.code.as_str(),
                        "EXECUTION_ERROR" | "EXECUTION_TIMEOUT"
                    );
                    if transient && retry_count < step.retry_policy.max_retries {
                        retry_count += 1;
                        tracing::debug!(
                            step_id = %step.id,
                            attempt = retry_count + 1,
                            backoff_ms = step.retry_policy.backoff_ms,
                            "retrying step"
                        );
                        tokio::time::sleep(Duration::from_millis(step.retry_policy.backoff_ms))
                            .await;
                        continue;
                    }
                    return Err((error, retry_count));
                }
            }
        }
    }

    /// Walk the rollback list, best-effort: a failing rollback step is
    /// logged and does not stop the remaining ones.
    async fn execute_rollback(
        &self,
        plan: &ExecutionPlan,
        executor: &ToolExecutor,
        context: &ExecutionContext,
    ) {
        if plan.rollback_steps.is_empty() {
            return;
        }

        tracing::info!(plan_id = %plan.id, "executing rollback");

        // rollback_steps were generated in reverse step order; walking them
        // in reverse again undoes work oldest-first.
        for step in plan.rollback_steps.iter().rev() {
            if let Err(error) = execute_step(step, executor, context).await {
                tracing::error!(
                    plan_id = %plan.id,
                    step_id = %step.id,
                    code = %error.code,
                    error = %error.message,
                    "rollback step failed, continuing"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Step execution
// ---------------------------------------------------------------------------

/// Execute a single step once. Tool-less steps trivially succeed.
async fn execute_step(
    step: &PlanStep,
    executor: &ToolExecutor,
    context: &ExecutionContext,
) -> std::result::Result<Option<Value>, StepError> {
    let Some(tool_name) = &step.tool_name else {
        return Ok(Some(json!({"status": "completed", "step_id": step.id})));
    };

    let arguments = Value::Object(step.parameters.clone().into_iter().collect());
    let result = executor
        .execute(
            tool_name,
            arguments,
            context,
            ExecuteOptions {
                timeout: Some(STEP_TIMEOUT),
                ..ExecuteOptions::default()
            },
        )
        .await;

    if result.success {
        Ok(result.data)
    } else {
        let failure = result.error.expect("failed result carries an error");
        Err(StepError {
            code: failure.code.to_string(),
            message: failure.message,
        })
    }
}

/// Choose the recovery action for a failed step.
///
/// Precondition steps (input validation, permission checks) invalidate
/// everything after them, so they roll the plan back. Verification and
/// logging steps are advisory and are skipped. Everything else aborts.
fn handle_step_failure(step: &PlanStep) -> RecoveryAction {
    if step.id.contains("validate") || step.id.contains("check_permissions") {
        return RecoveryAction::Rollback;
    }
    if step.id.contains("verify") || step.id.contains("log") {
        return RecoveryAction::Skip;
    }
    RecoveryAction::Abort
}

// ---------------------------------------------------------------------------
// Decomposition templates
// ---------------------------------------------------------------------------

/// Decompose an analyzed intent into ordered steps.
///
/// Each template chains every step to its predecessor, so the emitted list
/// is already in dependency order. Intents without a template collapse to a
/// single generic step.
pub fn decompose(analysis: &IntentAnalysis) -> Vec<PlanStep> {
    let suggested = analysis.suggested_tools.first().cloned();

    match analysis.primary_intent {
        Intent::CreateEntity => vec![
            PlanStep::new("validate_input", "Validate input data", None, vec![], 1),
            PlanStep::new(
                "check_permissions",
                "Check user permissions",
                None,
                vec!["validate_input".into()],
                2,
            ),
            PlanStep::new(
                "create_entity",
                "Create the entity",
                suggested,
                vec!["check_permissions".into()],
                3,
            ),
            PlanStep::new(
                "verify_creation",
                "Verify the entity was created",
                Some("query_entity".into()),
                vec!["create_entity".into()],
                4,
            ),
        ],
        Intent::UpdateEntity => vec![
            PlanStep::new(
                "find_entity",
                "Find the existing entity",
                Some("query_entity".into()),
                vec![],
                1,
            ),
            PlanStep::new(
                "validate_update",
                "Validate update data",
                None,
                vec!["find_entity".into()],
                2,
            ),
            PlanStep::new(
                "update_entity",
                "Update the entity",
                suggested,
                vec!["validate_update".into()],
                3,
            ),
            PlanStep::new(
                "verify_update",
                "Verify the entity was updated",
                Some("query_entity".into()),
                vec!["update_entity".into()],
                4,
            ),
        ],
        Intent::GenerateReport => vec![
            PlanStep::new(
                "gather_data",
                "Gather required data",
                Some("query_analytics".into()),
                vec![],
                1,
            ),
            PlanStep::new(
                "process_data",
                "Process and analyze data",
                None,
                vec!["gather_data".into()],
                2,
            ),
            PlanStep::new(
                "format_report",
                "Format the report output",
                None,
                vec!["process_data".into()],
                3,
            ),
            PlanStep::new(
                "validate_report",
                "Validate report completeness",
                None,
                vec!["format_report".into()],
                4,
            ),
        ],
        Intent::InventoryManagement => vec![
            PlanStep::new(
                "check_current_stock",
                "Check current inventory levels",
                Some("check_inventory".into()),
                vec![],
                1,
            ),
            PlanStep::new(
                "analyze_demand",
                "Analyze demand patterns",
                Some("query_analytics".into()),
                vec!["check_current_stock".into()],
                2,
            ),
            PlanStep::new(
                "calculate_reorder",
                "Calculate reorder quantities",
                None,
                vec!["analyze_demand".into()],
                3,
            ),
            PlanStep::new(
                "update_inventory",
                "Update inventory records",
                Some("update_stock".into()),
                vec!["calculate_reorder".into()],
                4,
            ),
        ],
        Intent::DeleteEntity | Intent::GeneralQuery => vec![PlanStep::new(
            "execute_query",
            "Execute the user request",
            suggested,
            vec![],
            1,
        )],
    }
}

/// Generate undo steps: one per tool-bound step, in reverse step order, each
/// bound to the tool's `rollback_` counterpart.
fn generate_rollback_steps(steps: &[PlanStep]) -> Vec<PlanStep> {
    steps
        .iter()
        .filter(|s| s.tool_name.is_some())
        .rev()
        .map(|s| {
            let tool = s.tool_name.as_deref().expect("filtered to tool-bound");
            PlanStep::new(
                format!("rollback_{}", s.id),
                format!("Rollback: {}", s.description),
                Some(format!("rollback_{tool}")),
                vec![],
                1,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
