//! Orchestrator request and response shapes.
//!
//! These are the types the API/dashboard layer exchanges with the core.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use stockmind_context::ConversationTurn;

use crate::provider::Usage;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Request the streaming path.
    pub stream: bool,
    /// Per-request deadline override; clamped to the configured band.
    pub timeout: Option<Duration>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Tool names exposed to the model for this request. Empty means all
    /// registered tools.
    pub enabled_tools: Vec<String>,
}

/// An incoming request from the API layer.
#[derive(Debug, Clone)]
pub struct OrchestratorRequest {
    /// Session this request belongs to.
    pub session_id: Uuid,
    /// The new user message.
    pub message: String,
    /// Trailing conversation history supplied by the caller, replayed ahead
    /// of the stored session history when present.
    pub history: Vec<ConversationTurn>,
    /// Free-form request context.
    pub context: HashMap<String, Value>,
    pub options: RequestOptions,
}

impl OrchestratorRequest {
    /// Create a minimal request with default options.
    pub fn new(session_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            session_id,
            message: message.into(),
            history: Vec::new(),
            context: HashMap::new(),
            options: RequestOptions::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// One tool call resolved during a request, with its outcome.
///
/// Partial success is representable: a failed call sits alongside the
/// successful ones in the same response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallWithResult {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    /// Tool payload when the call succeeded.
    pub result: Option<Value>,
    pub success: bool,
    /// Error description when the call failed.
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// The assembled answer for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorResponse {
    /// Generated text.
    pub content: String,
    /// Tool calls the provider requested, each with its resolution.
    pub tool_calls: Vec<ToolCallWithResult>,
    /// Reserved for future retrieval support; currently always empty.
    pub citations: Vec<Value>,
    pub usage: Usage,
    /// End-to-end request duration in milliseconds.
    pub duration_ms: u64,
    /// Provider that served the request.
    pub provider: String,
    /// Model identifier reported by the provider.
    pub model: String,
    /// Free-form response metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// One chunk of a streaming response, tagged with its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseChunk {
    pub session_id: Uuid,
    pub provider: String,
    pub delta: String,
    /// True on the terminal marker chunk.
    pub done: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_request_defaults() {
        let request = OrchestratorRequest::new(Uuid::now_v7(), "hello");
        assert!(!request.options.stream);
        assert!(request.options.enabled_tools.is_empty());
        assert!(request.history.is_empty());
    }

    #[test]
    fn response_serializes_partial_tool_failure() {
        let response = OrchestratorResponse {
            content: "done".into(),
            tool_calls: vec![
                ToolCallWithResult {
                    id: "1".into(),
                    name: "check_inventory".into(),
                    arguments: json!({}),
                    result: Some(json!({"quantity": 3})),
                    success: true,
                    error: None,
                    duration_ms: 12,
                },
                ToolCallWithResult {
                    id: "2".into(),
                    name: "update_stock".into(),
                    arguments: json!({}),
                    result: None,
                    success: false,
                    error: Some("PERMISSION_DENIED".into()),
                    duration_ms: 1,
                },
            ],
            citations: Vec::new(),
            usage: Usage::default(),
            duration_ms: 100,
            provider: "mock".into(),
            model: "mock-1".into(),
            metadata: HashMap::new(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["tool_calls"][0]["success"], true);
        assert_eq!(json["tool_calls"][1]["success"], false);
        assert!(json["citations"].as_array().unwrap().is_empty());
    }
}
