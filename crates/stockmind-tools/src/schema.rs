//! Schema validation capability.
//!
//! Tool inputs and outputs are validated against JSON Schema documents. The
//! [`Schema`] trait keeps the rest of the crate independent of the concrete
//! validation library; [`JsonSchema`] is the Draft 7 implementation backed by
//! the `jsonschema` crate.

use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ToolsError};

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A single schema violation with its location in the validated document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// JSON pointer to the offending value (e.g. `/items/0/quantity`).
    pub path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

/// The full set of violations produced by one validation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDiagnostics {
    pub violations: Vec<SchemaViolation>,
}

impl SchemaDiagnostics {
    /// Render the diagnostics as a single human-readable line.
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| {
                if v.path.is_empty() {
                    v.message.clone()
                } else {
                    format!("{}: {}", v.path, v.message)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ---------------------------------------------------------------------------
// Schema capability
// ---------------------------------------------------------------------------

/// A compiled schema that can judge values.
///
/// Implementations must be cheap to call repeatedly; compile once, validate
/// many times.
pub trait Schema: Send + Sync {
    /// Validate a value, returning all violations on failure.
    fn validate(&self, value: &Value) -> std::result::Result<(), SchemaDiagnostics>;
}

/// JSON Schema (Draft 7) implementation of [`Schema`].
pub struct JsonSchema {
    compiled: JSONSchema,
}

impl JsonSchema {
    /// Compile a schema document.
    ///
    /// `context` names the owner of the schema (tool name plus direction) and
    /// only appears in error messages.
    pub fn compile(document: &Value, context: &str) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(document)
            .map_err(|e| ToolsError::SchemaCompile {
                context: context.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { compiled })
    }
}

impl Schema for JsonSchema {
    fn validate(&self, value: &Value) -> std::result::Result<(), SchemaDiagnostics> {
        if let Err(errors) = self.compiled.validate(value) {
            let violations = errors
                .map(|e| SchemaViolation {
                    path: e.instance_path.to_string(),
                    message: e.to_string(),
                })
                .collect::<Vec<_>>();
            return Err(SchemaDiagnostics { violations });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
