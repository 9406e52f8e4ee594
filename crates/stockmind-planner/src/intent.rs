//! Rule-based intent analysis.
//!
//! Classifies free-text requests into a primary intent with confidence,
//! extracted entities and planning hints. This is deliberately keyword-based:
//! it is fast, deterministic and easy to audit. A model-based classifier can
//! replace it behind the same [`IntentAnalysis`] shape.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The primary intent classes the planner knows how to decompose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CreateEntity,
    UpdateEntity,
    DeleteEntity,
    GenerateReport,
    InventoryManagement,
    /// Fallback for anything the keyword rules do not recognize.
    GeneralQuery,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CreateEntity => "create_entity",
            Self::UpdateEntity => "update_entity",
            Self::DeleteEntity => "delete_entity",
            Self::GenerateReport => "generate_report",
            Self::InventoryManagement => "inventory_management",
            Self::GeneralQuery => "general_query",
        };
        write!(f, "{s}")
    }
}

/// Estimated effort class for fulfilling an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// The classification of one free-text request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub primary_intent: Intent,
    /// Classifier confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Named entities extracted from the text.
    pub entities: HashMap<String, String>,
    /// Whether fulfilling this intent needs a multi-step plan.
    pub requires_planning: bool,
    /// Whether fulfilling this intent needs tool execution.
    pub requires_tools: bool,
    pub complexity: Complexity,
    /// Tool names likely useful for this intent.
    pub suggested_tools: Vec<String>,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Words that mark an operation as spanning many entities, which forces
/// planning and high complexity regardless of the primary intent.
const BULK_INDICATORS: [&str; 6] = ["multiple", "batch", "bulk", "all", "every", "comprehensive"];

static PRODUCT_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"products?\s+(\S+)").expect("static pattern"));
static SUPPLIER_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"suppliers?\s+(\S+)").expect("static pattern"));

/// Classify a free-text request.
pub fn analyze_intent(text: &str) -> IntentAnalysis {
    let message = text.to_lowercase();

    let mut primary_intent = Intent::GeneralQuery;
    let mut confidence = 0.5;
    let mut requires_planning = false;
    let mut requires_tools = false;
    let mut complexity = Complexity::Low;
    let mut suggested_tools: Vec<String> = Vec::new();

    let contains_any = |words: &[&str]| words.iter().any(|w| message.contains(w));

    if contains_any(&["create", "add", "new"]) {
        primary_intent = Intent::CreateEntity;
        confidence = 0.8;
        requires_tools = true;
        suggested_tools.extend(["create_product".into(), "create_supplier".into()]);
    } else if contains_any(&["update", "change", "modify"]) {
        primary_intent = Intent::UpdateEntity;
        confidence = 0.8;
        requires_tools = true;
        suggested_tools.extend(["update_product".into(), "update_inventory".into()]);
    } else if contains_any(&["delete", "remove"]) {
        primary_intent = Intent::DeleteEntity;
        confidence = 0.8;
        requires_tools = true;
        suggested_tools.extend(["delete_product".into(), "archive_supplier".into()]);
    } else if contains_any(&["analyze", "report", "dashboard"]) {
        primary_intent = Intent::GenerateReport;
        confidence = 0.8;
        requires_planning = true;
        requires_tools = true;
        complexity = Complexity::Medium;
        suggested_tools.extend(["query_analytics".into(), "generate_report".into()]);
    } else if contains_any(&["inventory", "stock", "quantity"]) {
        primary_intent = Intent::InventoryManagement;
        confidence = 0.8;
        requires_tools = true;
        suggested_tools.extend(["check_inventory".into(), "update_stock".into()]);
    }

    if contains_any(&BULK_INDICATORS) {
        requires_planning = true;
        complexity = Complexity::High;
    }

    let mut entities = HashMap::new();
    if let Some(captures) = PRODUCT_ENTITY.captures(&message) {
        entities.insert("product".to_string(), captures[1].to_string());
    }
    if let Some(captures) = SUPPLIER_ENTITY.captures(&message) {
        entities.insert("supplier".to_string(), captures[1].to_string());
    }

    tracing::debug!(
        intent = %primary_intent,
        confidence,
        requires_planning,
        ?complexity,
        "intent analyzed"
    );

    IntentAnalysis {
        primary_intent,
        confidence,
        entities,
        requires_planning,
        requires_tools,
        complexity,
        suggested_tools,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
