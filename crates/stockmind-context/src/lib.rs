//! Session and conversation state for the stockmind core.
//!
//! The [`ContextManager`] owns session lifecycle and bounded conversation
//! history: create/load sessions, append turns, read back recent context,
//! and garbage-collect sessions idle past a TTL.

pub mod error;
pub mod manager;
pub mod session;

pub use error::{ContextError, Result};
pub use manager::{
    ContextManager, ContextStats, PrunerHandle, DEFAULT_PRUNE_INTERVAL, DEFAULT_SESSION_TTL,
    MAX_HISTORY_TURNS,
};
pub use session::{ConversationTurn, Session, ToolCallOutcome, ToolCallRequest, TurnRole};
