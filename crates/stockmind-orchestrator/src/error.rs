//! Orchestrator error types.
//!
//! Every failure that escapes the orchestrator is one of these variants;
//! callers never see a raw, unclassified error. [`OrchestratorError::code`]
//! exposes the machine-readable tag surfaced to API layers.

/// Unified error type for the orchestration façade.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The request deadline elapsed before the provider answered.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The incoming request failed shape or session validation.
    #[error("invalid request: {reason}")]
    Validation { reason: String },

    /// No healthy provider in the fallback chain.
    #[error("no providers available")]
    NoProvidersAvailable,

    /// The selected provider failed to produce a response.
    #[error("provider `{provider}` failed: {reason}")]
    Provider { provider: String, reason: String },

    /// Catch-all for unexpected internal errors. Anything not recognized by
    /// the classifier lands here, already wrapped.
    #[error("internal orchestrator error: {reason}")]
    Internal { reason: String },
}

impl OrchestratorError {
    /// Machine-readable error code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "TIMEOUT",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NoProvidersAvailable => "NO_PROVIDERS_AVAILABLE",
            Self::Provider { .. } => "PROVIDER_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<stockmind_context::ContextError> for OrchestratorError {
    fn from(err: stockmind_context::ContextError) -> Self {
        Self::Validation {
            reason: err.to_string(),
        }
    }
}

/// Convenience alias used throughout the orchestrator crate.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(OrchestratorError::Timeout { timeout_ms: 30_000 }.code(), "TIMEOUT");
        assert_eq!(OrchestratorError::NoProvidersAvailable.code(), "NO_PROVIDERS_AVAILABLE");
        assert_eq!(
            OrchestratorError::Internal { reason: "boom".into() }.code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn context_errors_classify_as_validation() {
        let err: OrchestratorError = stockmind_context::ContextError::SessionNotFound {
            session_id: uuid::Uuid::now_v7(),
        }
        .into();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
