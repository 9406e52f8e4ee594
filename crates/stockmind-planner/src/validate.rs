//! Plan validation.
//!
//! Before a plan is released for execution it is checked for circular
//! dependencies, references to steps that do not exist, and tool bindings
//! absent from the registry. Steps that cannot be reached from a
//! zero-dependency root are reported as warnings, not errors.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use stockmind_tools::ToolRegistry;

use crate::plan::{ExecutionPlan, PlanStep};

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// Classification of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    CircularDependency,
    ToolNotFound,
    InvalidDependency,
    UnreachableStep,
}

/// One validation finding, tied to a step where applicable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanIssue {
    pub code: IssueCode,
    /// The step this issue concerns; `None` for plan-wide issues.
    pub step_id: Option<String>,
    pub message: String,
}

/// The outcome of validating one plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<PlanIssue>,
    pub warnings: Vec<PlanIssue>,
}

impl ValidationReport {
    /// A plan is valid when it produced no errors; warnings do not block.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a plan against its own dependency graph and the tool registry.
pub fn validate_plan(plan: &ExecutionPlan, registry: &ToolRegistry) -> ValidationReport {
    let mut report = ValidationReport::default();

    if has_circular_dependencies(&plan.steps) {
        report.errors.push(PlanIssue {
            code: IssueCode::CircularDependency,
            step_id: None,
            message: "plan contains circular dependencies between steps".into(),
        });
    }

    for step in &plan.steps {
        if let Some(tool) = &step.tool_name
            && !registry.contains(tool)
        {
            report.errors.push(PlanIssue {
                code: IssueCode::ToolNotFound,
                step_id: Some(step.id.clone()),
                message: format!("tool `{tool}` not found in registry"),
            });
        }
    }

    let step_ids: HashSet<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
    for step in &plan.steps {
        for dep in &step.dependencies {
            if !step_ids.contains(dep.as_str()) {
                report.errors.push(PlanIssue {
                    code: IssueCode::InvalidDependency,
                    step_id: Some(step.id.clone()),
                    message: format!("step depends on non-existent step `{dep}`"),
                });
            }
        }
    }

    let reachable = reachable_steps(&plan.steps);
    for step in &plan.steps {
        if !reachable.contains(step.id.as_str()) {
            report.warnings.push(PlanIssue {
                code: IssueCode::UnreachableStep,
                step_id: Some(step.id.clone()),
                message: "step is not reachable from any zero-dependency root".into(),
            });
        }
    }

    report
}

/// DFS cycle detection over step ids.
fn has_circular_dependencies(steps: &[PlanStep]) -> bool {
    let by_id: HashMap<&str, &PlanStep> = steps.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_stack: HashSet<&str> = HashSet::new();

    fn visit<'a>(
        id: &'a str,
        by_id: &HashMap<&'a str, &'a PlanStep>,
        visited: &mut HashSet<&'a str>,
        on_stack: &mut HashSet<&'a str>,
    ) -> bool {
        if on_stack.contains(id) {
            return true;
        }
        if visited.contains(id) {
            return false;
        }
        visited.insert(id);
        on_stack.insert(id);

        if let Some(step) = by_id.get(id) {
            for dep in &step.dependencies {
                if visit(dep.as_str(), by_id, visited, on_stack) {
                    return true;
                }
            }
        }

        on_stack.remove(id);
        false
    }

    steps
        .iter()
        .any(|s| visit(s.id.as_str(), &by_id, &mut visited, &mut on_stack))
}

/// Walk the dependency graph from every zero-dependency root and collect the
/// ids that can be reached.
fn reachable_steps(steps: &[PlanStep]) -> HashSet<String> {
    let by_id: HashMap<&str, &PlanStep> = steps.iter().map(|s| (s.id.as_str(), s)).collect();
    // Dependents of each step: edges point from prerequisite to dependent.
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for step in steps {
        for dep in &step.dependencies {
            dependents.entry(dep.as_str()).or_default().push(step.id.as_str());
        }
    }

    let mut reachable: HashSet<String> = HashSet::new();
    let mut stack: Vec<&str> = steps
        .iter()
        .filter(|s| s.dependencies.is_empty())
        .map(|s| s.id.as_str())
        .collect();

    while let Some(id) = stack.pop() {
        if !reachable.insert(id.to_string()) {
            continue;
        }
        if let Some(next) = dependents.get(id) {
            for dependent in next {
                // Only descend when the dependent's prerequisites are all
                // themselves reachable candidates (present in the plan).
                if by_id.contains_key(dependent) {
                    stack.push(dependent);
                }
            }
        }
    }

    reachable
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::analyze_intent;
    use crate::plan::{PlanMetadata, PlanStep};
    use chrono::Utc;
    use serde_json::json;
    use stockmind_tools::{AccessLevel, ToolDefinition};
    use uuid::Uuid;

    fn registry_with(names: &[&str]) -> ToolRegistry {
        let registry = ToolRegistry::new();
        for name in names {
            registry
                .register(ToolDefinition::new(
                    *name,
                    format!("{name} tool"),
                    "test",
                    json!({"type": "object"}),
                    json!({}),
                    AccessLevel::ReadOnly,
                ))
                .unwrap();
        }
        registry
    }

    fn plan_of(steps: Vec<PlanStep>) -> ExecutionPlan {
        let analysis = analyze_intent("test");
        ExecutionPlan {
            id: Uuid::now_v7(),
            session_id: Uuid::now_v7(),
            intent: "test".into(),
            estimated_total_duration_ms: steps.iter().map(|s| s.estimated_duration_ms).sum(),
            steps,
            created_at: Utc::now(),
            rollback_steps: vec![],
            metadata: PlanMetadata {
                complexity: analysis.complexity,
                analysis,
            },
        }
    }

    #[test]
    fn acyclic_plan_is_valid() {
        let plan = plan_of(vec![
            PlanStep::new("a", "A", None, vec![], 1),
            PlanStep::new("b", "B", None, vec!["a".into()], 2),
            PlanStep::new("c", "C", None, vec!["b".into()], 3),
        ]);

        let report = validate_plan(&plan, &registry_with(&[]));
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn two_step_cycle_is_rejected() {
        let plan = plan_of(vec![
            PlanStep::new("a", "A", None, vec!["b".into()], 1),
            PlanStep::new("b", "B", None, vec!["a".into()], 2),
        ]);

        let report = validate_plan(&plan, &registry_with(&[]));
        assert!(!report.is_valid());
        assert!(report
            .errors
            .iter()
            .any(|e| e.code == IssueCode::CircularDependency));
    }

    #[test]
    fn self_cycle_is_rejected() {
        let plan = plan_of(vec![PlanStep::new("a", "A", None, vec!["a".into()], 1)]);
        let report = validate_plan(&plan, &registry_with(&[]));
        assert!(report
            .errors
            .iter()
            .any(|e| e.code == IssueCode::CircularDependency));
    }

    #[test]
    fn dangling_dependency_is_flagged() {
        let plan = plan_of(vec![PlanStep::new(
            "a",
            "A",
            None,
            vec!["ghost".into()],
            1,
        )]);

        let report = validate_plan(&plan, &registry_with(&[]));
        let issue = report
            .errors
            .iter()
            .find(|e| e.code == IssueCode::InvalidDependency)
            .expect("invalid dependency reported");
        assert_eq!(issue.step_id.as_deref(), Some("a"));
        assert!(issue.message.contains("ghost"));
    }

    #[test]
    fn unknown_tool_is_flagged() {
        let plan = plan_of(vec![PlanStep::new(
            "fetch",
            "Fetch data",
            Some("query_analytics".into()),
            vec![],
            1,
        )]);

        let report = validate_plan(&plan, &registry_with(&[]));
        assert!(report.errors.iter().any(|e| e.code == IssueCode::ToolNotFound));

        let report = validate_plan(&plan, &registry_with(&["query_analytics"]));
        assert!(report.is_valid());
    }

    #[test]
    fn step_cut_off_from_roots_is_a_warning_only() {
        // "b" and "c" depend on each other's subtree but "c"'s prerequisite
        // chain never reaches a zero-dependency root.
        let plan = plan_of(vec![
            PlanStep::new("a", "A", None, vec![], 1),
            PlanStep::new("b", "B", None, vec!["a".into()], 2),
            PlanStep::new("c", "C", None, vec!["ghost".into()], 3),
        ]);

        let report = validate_plan(&plan, &registry_with(&[]));
        // The dangling dep is an error; unreachability of "c" is a warning.
        assert!(report.warnings.iter().any(|w| {
            w.code == IssueCode::UnreachableStep && w.step_id.as_deref() == Some("c")
        }));
    }
}
