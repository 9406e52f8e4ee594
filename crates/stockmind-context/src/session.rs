//! Session and conversation turn types.
//!
//! A [`Session`] is a long-lived conversational identity for one user; a
//! [`ConversationTurn`] is one message exchange unit inside it. Turns may
//! carry the tool calls an assistant requested and the outcomes that came
//! back, so a session's history is a complete record of what was asked, said
//! and executed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A conversational session owned by the context manager.
///
/// Mutated only through [`crate::ContextManager`]; `last_activity_at` is
/// monotonically non-decreasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier (UUID v7).
    pub id: Uuid,
    /// Owning user.
    pub user_id: String,
    /// Owning organization, if any.
    pub org_id: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last time anything touched this session.
    pub last_activity_at: DateTime<Utc>,
    /// Free-form session metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// User preferences scoped to this session.
    #[serde(default)]
    pub preferences: HashMap<String, Value>,
}

impl Session {
    /// Create a fresh session with empty metadata and preferences.
    pub fn new(user_id: impl Into<String>, org_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id: user_id.into(),
            org_id,
            created_at: now,
            last_activity_at: now,
            metadata: HashMap::new(),
            preferences: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation turns
// ---------------------------------------------------------------------------

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
    Tool,
    System,
}

/// A tool invocation requested within a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation id assigned by the model provider.
    pub id: String,
    /// Name of the requested tool.
    pub name: String,
    /// Raw arguments as produced by the provider.
    pub arguments: Value,
}

/// The outcome of one tool invocation, correlated back to its request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallOutcome {
    /// The [`ToolCallRequest::id`] this outcome answers.
    pub call_id: String,
    /// Serialized result payload (or error description).
    pub result: Value,
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// One message exchange unit within a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Tool calls the assistant requested in this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Outcomes of tool calls resolved in this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolCallOutcome>,
}

impl ConversationTurn {
    /// Create a plain text turn for the given role.
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    /// Builder: attach requested tool calls.
    pub fn with_tool_calls(mut self, calls: Vec<ToolCallRequest>) -> Self {
        self.tool_calls = calls;
        self
    }

    /// Builder: attach resolved tool outcomes.
    pub fn with_tool_results(mut self, results: Vec<ToolCallOutcome>) -> Self {
        self.tool_results = results;
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
