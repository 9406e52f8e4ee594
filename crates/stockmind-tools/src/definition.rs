//! Declarative tool definitions.
//!
//! A [`ToolDefinition`] describes *what* a tool is: its schemas, access level
//! and required permissions. It deliberately carries no executable code; the
//! mapping from name to implementation lives in [`crate::handler`], so that
//! catalogs can be exported, imported and inspected without touching any
//! handler.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Access levels
// ---------------------------------------------------------------------------

/// How much autonomy an agent has when invoking a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// The tool only reads state and may be called freely.
    ReadOnly,
    /// The tool mutates state and requires out-of-band approval.
    ReadWriteApproval,
    /// The tool mutates state and may be called without approval.
    Autonomous,
}

// ---------------------------------------------------------------------------
// Tool definition
// ---------------------------------------------------------------------------

/// Declarative metadata for a single tool.
///
/// Definitions are immutable once registered; a new behavior means a new
/// `version` under the same name, registered into a fresh catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name (registry key).
    pub name: String,

    /// Human-readable description, also shown to the model.
    pub description: String,

    /// Grouping category (e.g. `"inventory"`, `"analytics"`).
    pub category: String,

    /// JSON Schema for the arguments the tool accepts.
    pub input_schema: Value,

    /// JSON Schema for the payload the tool returns.
    pub output_schema: Value,

    /// Autonomy level for invocation.
    pub access_level: AccessLevel,

    /// Permission strings the caller must hold, all of them.
    #[serde(default)]
    pub required_permissions: Vec<String>,

    /// Semantic version of the tool contract.
    pub version: String,

    /// Free-form metadata for consumers (cost hints, owner team, ...).
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ToolDefinition {
    /// Create a definition with empty permissions and metadata.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        input_schema: Value,
        output_schema: Value,
        access_level: AccessLevel,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: category.into(),
            input_schema,
            output_schema,
            access_level,
            required_permissions: Vec::new(),
            version: "1.0.0".into(),
            metadata: HashMap::new(),
        }
    }

    /// Builder: require a permission.
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.required_permissions.push(permission.into());
        self
    }

    /// Builder: set the contract version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Builder: attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A provider-agnostic function-call schema projected from a definition.
///
/// This is the shape handed to model providers so they can emit tool calls;
/// it intentionally omits permissions, access level and the output schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<&ToolDefinition> for FunctionSchema {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            parameters: def.input_schema.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_accumulates_fields() {
        let def = ToolDefinition::new(
            "check_inventory",
            "Look up current stock levels",
            "inventory",
            json!({"type": "object"}),
            json!({"type": "object"}),
            AccessLevel::ReadOnly,
        )
        .with_permission("inventory:read")
        .with_version("2.1.0")
        .with_metadata("owner", json!("ops"));

        assert_eq!(def.required_permissions, vec!["inventory:read"]);
        assert_eq!(def.version, "2.1.0");
        assert_eq!(def.metadata["owner"], "ops");
    }

    #[test]
    fn access_level_snake_case_serialization() {
        let json = serde_json::to_string(&AccessLevel::ReadWriteApproval).unwrap();
        assert_eq!(json, "\"read_write_approval\"");
        let parsed: AccessLevel = serde_json::from_str("\"autonomous\"").unwrap();
        assert_eq!(parsed, AccessLevel::Autonomous);
    }

    #[test]
    fn function_schema_projection() {
        let def = ToolDefinition::new(
            "search_inventory",
            "Full-text search over products",
            "inventory",
            json!({"type": "object", "properties": {"query": {"type": "string"}}}),
            json!({"type": "array"}),
            AccessLevel::ReadOnly,
        );

        let schema = FunctionSchema::from(&def);
        assert_eq!(schema.name, "search_inventory");
        assert_eq!(schema.parameters["properties"]["query"]["type"], "string");
    }
}
