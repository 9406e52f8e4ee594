//! Orchestrator configuration.
//!
//! Plain serde-deserializable settings with defaults, loadable from TOML.
//! Timeouts are clamped into their allowed bands when read, so a bad config
//! file degrades to the nearest legal value instead of failing requests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, Result};

/// Allowed band for the per-request deadline, in seconds.
const REQUEST_TIMEOUT_BOUNDS: (u64, u64) = (1, 300);

/// Settings for the orchestration façade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// How many trailing turns are replayed to the provider.
    #[serde(default = "default_max_history")]
    pub max_conversation_history: usize,

    /// Per-request deadline in seconds. Clamped to 1..=300.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Advisory concurrency cap. Enforcement belongs to the caller/gateway;
    /// the core only reports it.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,

    /// Capacity of the lifecycle event bus.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_max_history() -> usize {
    50
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    10
}

fn default_event_capacity() -> usize {
    256
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_conversation_history: default_max_history(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_requests: default_max_concurrent(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl OrchestratorConfig {
    /// Parse a TOML document into a config, filling defaults for missing
    /// keys.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        toml::from_str(document).map_err(|e| OrchestratorError::Validation {
            reason: format!("invalid orchestrator config: {e}"),
        })
    }

    /// The effective per-request deadline, clamped into its allowed band.
    pub fn request_timeout(&self) -> Duration {
        let (min, max) = REQUEST_TIMEOUT_BOUNDS;
        Duration::from_secs(self.request_timeout_secs.clamp(min, max))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_conversation_history, 50);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn toml_overrides_and_fills_defaults() {
        let config = OrchestratorConfig::from_toml_str(
            r#"
            max_conversation_history = 20
            request_timeout_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.max_conversation_history, 20);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_concurrent_requests, 10);
    }

    #[test]
    fn out_of_band_timeouts_are_clamped() {
        let mut config = OrchestratorConfig::default();
        config.request_timeout_secs = 0;
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
        config.request_timeout_secs = 100_000;
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn malformed_toml_is_a_validation_error() {
        let result = OrchestratorConfig::from_toml_str("max_conversation_history = \"lots\"");
        assert!(matches!(result, Err(OrchestratorError::Validation { .. })));
    }
}
