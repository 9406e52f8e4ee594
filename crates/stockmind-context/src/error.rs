//! Context manager error types.

use uuid::Uuid;

/// Unified error type for session and conversation state.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The referenced session does not exist (or was pruned).
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: Uuid },

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the context crate.
pub type Result<T> = std::result::Result<T, ContextError>;
