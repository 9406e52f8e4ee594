//! Tool layer error types.
//!
//! All registry and handler plumbing surfaces errors through [`ToolsError`].
//! Note that the executor itself never returns these to its caller: execution
//! failures are folded into the [`crate::executor::ToolResult`] envelope.

/// Unified error type for the tool layer.
#[derive(Debug, thiserror::Error)]
pub enum ToolsError {
    // -- Registry errors ----------------------------------------------------
    /// A tool with the same name is already registered. Definitions are
    /// immutable once registered, so this is always a caller bug.
    #[error("tool already registered: {name}")]
    DuplicateTool { name: String },

    /// The requested tool is not in the registry.
    #[error("tool not found: {name}")]
    ToolNotFound { name: String },

    // -- Schema errors ------------------------------------------------------
    /// The schema document itself could not be compiled.
    #[error("invalid schema for `{context}`: {reason}")]
    SchemaCompile { context: String, reason: String },

    // -- Handler errors -----------------------------------------------------
    /// No executable handler is bound to the tool name.
    #[error("no handler bound for tool: {name}")]
    HandlerNotBound { name: String },

    /// A handler reported a failure while executing.
    #[error("handler failed for `{tool_name}`: {reason}")]
    HandlerFailed { tool_name: String, reason: String },

    // -- Serialization ------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    // -- Generic ------------------------------------------------------------
    /// Catch-all for unexpected internal errors. Prefer a typed variant
    /// whenever possible.
    #[error("internal tool error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the tool layer.
pub type Result<T> = std::result::Result<T, ToolsError>;
