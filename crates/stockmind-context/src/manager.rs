//! Session lifecycle and conversation history.
//!
//! The [`ContextManager`] owns every session and its history in a single
//! shared keyed store. It is backed by [`DashMap`], whose per-entry locking
//! serializes all mutations of one session (append turn, bump activity,
//! prune) while letting unrelated sessions proceed in parallel.
//!
//! Sessions idle past a TTL are garbage-collected by [`ContextManager::
//! prune_old_sessions`], either on demand or through the explicitly started
//! [`PrunerHandle`] sweep. There is no process-signal hook; the host decides
//! when the sweep runs and when it stops.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{ContextError, Result};
use crate::session::{ConversationTurn, Session};

/// Sliding window: only this many of the most recent turns are retained.
pub const MAX_HISTORY_TURNS: usize = 1000;

/// Sessions idle longer than this are eligible for pruning.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cadence of the background pruning sweep.
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// How many trailing turns `relevant_context` quotes.
const RELEVANT_CONTEXT_TURNS: usize = 5;

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

/// A session plus its append-only history, stored under one map entry so the
/// entry lock covers both.
struct SessionState {
    session: Session,
    history: Vec<ConversationTurn>,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Observability snapshot of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextStats {
    pub session_count: usize,
    pub total_turns: usize,
    pub avg_turns_per_session: f64,
}

// ---------------------------------------------------------------------------
// Context manager
// ---------------------------------------------------------------------------

/// In-memory owner of sessions and conversation histories.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`. Constructed explicitly
/// and injected; there is no ambient singleton.
#[derive(Clone)]
pub struct ContextManager {
    sessions: Arc<DashMap<Uuid, SessionState>>,
}

impl ContextManager {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Allocate a fresh session with empty metadata, preferences and history.
    pub fn create_session(&self, user_id: impl Into<String>, org_id: Option<String>) -> Session {
        let session = Session::new(user_id, org_id);
        tracing::info!(
            session_id = %session.id,
            user_id = %session.user_id,
            "session created"
        );
        self.sessions.insert(
            session.id,
            SessionState {
                session: session.clone(),
                history: Vec::new(),
            },
        );
        session
    }

    /// Load a session snapshot, bumping its activity timestamp.
    pub fn load_session(&self, session_id: &Uuid) -> Result<Session> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(ContextError::SessionNotFound {
                session_id: *session_id,
            })?;

        touch(&mut entry.session);
        Ok(entry.session.clone())
    }

    /// Set a preference value on a session.
    pub fn set_preference(
        &self,
        session_id: &Uuid,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(ContextError::SessionNotFound {
                session_id: *session_id,
            })?;
        entry.session.preferences.insert(key.into(), value);
        touch(&mut entry.session);
        Ok(())
    }

    /// Set a metadata value on a session.
    pub fn set_metadata(
        &self,
        session_id: &Uuid,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(ContextError::SessionNotFound {
                session_id: *session_id,
            })?;
        entry.session.metadata.insert(key.into(), value);
        touch(&mut entry.session);
        Ok(())
    }

    /// Append a turn to a session's history.
    ///
    /// The history is a sliding window: once it exceeds
    /// [`MAX_HISTORY_TURNS`], the oldest turns are dropped. Appending never
    /// rejects a write.
    pub fn add_turn(&self, session_id: &Uuid, turn: ConversationTurn) -> Result<()> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(ContextError::SessionNotFound {
                session_id: *session_id,
            })?;

        entry.history.push(turn);
        if entry.history.len() > MAX_HISTORY_TURNS {
            let excess = entry.history.len() - MAX_HISTORY_TURNS;
            entry.history.drain(0..excess);
            tracing::debug!(
                session_id = %session_id,
                dropped = excess,
                "history window trimmed"
            );
        }
        touch(&mut entry.session);
        Ok(())
    }

    /// Return the most recent `limit` turns (all of them if `None`),
    /// oldest first.
    pub fn conversation_history(
        &self,
        session_id: &Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationTurn>> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or(ContextError::SessionNotFound {
                session_id: *session_id,
            })?;

        let history = &entry.history;
        let start = match limit {
            Some(n) => history.len().saturating_sub(n),
            None => 0,
        };
        Ok(history[start..].to_vec())
    }

    /// Best-effort text assembly of what the model should know about a
    /// session: serialized preferences, the last few turns, and serialized
    /// metadata. A placeholder for retrieval-augmented context, not semantic
    /// search.
    pub fn relevant_context(&self, session_id: &Uuid, _message: &str) -> Result<String> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or(ContextError::SessionNotFound {
                session_id: *session_id,
            })?;

        let mut sections = Vec::new();

        if !entry.session.preferences.is_empty() {
            sections.push(format!(
                "User preferences: {}",
                serde_json::to_string(&entry.session.preferences)?
            ));
        }

        let recent = entry
            .history
            .iter()
            .rev()
            .take(RELEVANT_CONTEXT_TURNS)
            .collect::<Vec<_>>();
        if !recent.is_empty() {
            let lines = recent
                .iter()
                .rev()
                .map(|t| format!("{:?}: {}", t.role, t.content))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("Recent conversation:\n{lines}"));
        }

        if !entry.session.metadata.is_empty() {
            sections.push(format!(
                "Session metadata: {}",
                serde_json::to_string(&entry.session.metadata)?
            ));
        }

        Ok(sections.join("\n\n"))
    }

    /// Delete sessions (and their histories) idle longer than `max_age`.
    /// Returns the number pruned.
    pub fn prune_old_sessions(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::hours(24));

        let stale: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|e| e.value().session.last_activity_at < cutoff)
            .map(|e| *e.key())
            .collect();

        let count = stale.len();
        for id in stale {
            self.sessions.remove(&id);
        }

        if count > 0 {
            tracing::info!(pruned = count, "idle sessions pruned");
        }
        count
    }

    /// Start the recurring pruning sweep on the tokio runtime.
    ///
    /// The sweep runs every `interval` until the returned handle is stopped
    /// or dropped by the host. Call sites own the lifecycle; nothing here
    /// listens for process signals.
    pub fn start_pruner(&self, interval: Duration, max_age: Duration) -> PrunerHandle {
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh store is
            // not swept at startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.prune_old_sessions(max_age);
            }
        });

        tracing::debug!(interval_s = interval.as_secs(), "session pruner started");
        PrunerHandle { handle }
    }

    /// Observability counters for the store.
    pub fn stats(&self) -> ContextStats {
        let session_count = self.sessions.len();
        let total_turns: usize = self.sessions.iter().map(|e| e.value().history.len()).sum();
        let avg_turns_per_session = if session_count == 0 {
            0.0
        } else {
            total_turns as f64 / session_count as f64
        };

        ContextStats {
            session_count,
            total_turns,
            avg_turns_per_session,
        }
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop every session. Used by the orchestrator's shutdown path.
    pub fn clear(&self) {
        self.sessions.clear();
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Bump a session's activity clock, never moving it backwards.
fn touch(session: &mut Session) {
    let now = Utc::now();
    if now > session.last_activity_at {
        session.last_activity_at = now;
    }
}

// ---------------------------------------------------------------------------
// Pruner handle
// ---------------------------------------------------------------------------

/// Handle for the background pruning sweep started by
/// [`ContextManager::start_pruner`].
pub struct PrunerHandle {
    handle: JoinHandle<()>,
}

impl PrunerHandle {
    /// Stop the sweep.
    pub fn stop(self) {
        self.handle.abort();
        tracing::debug!("session pruner stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TurnRole;
    use serde_json::json;

    #[test]
    fn create_and_load_session() {
        let manager = ContextManager::new();
        let session = manager.create_session("user-1", Some("org-1".into()));

        let loaded = manager.load_session(&session.id).unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.user_id, "user-1");
        assert!(loaded.last_activity_at >= session.last_activity_at);
    }

    #[test]
    fn load_unknown_session_errors() {
        let manager = ContextManager::new();
        let missing = Uuid::now_v7();
        assert!(matches!(
            manager.load_session(&missing),
            Err(ContextError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn add_turn_to_unknown_session_errors() {
        let manager = ContextManager::new();
        let missing = Uuid::now_v7();
        let result = manager.add_turn(&missing, ConversationTurn::user("hello"));
        assert!(result.is_err());
    }

    #[test]
    fn history_is_a_sliding_window() {
        let manager = ContextManager::new();
        let session = manager.create_session("user-1", None);

        for i in 0..(MAX_HISTORY_TURNS + 1) {
            manager
                .add_turn(&session.id, ConversationTurn::user(format!("turn {i}")))
                .unwrap();
        }

        let history = manager.conversation_history(&session.id, None).unwrap();
        assert_eq!(history.len(), MAX_HISTORY_TURNS);
        // Oldest turn (index 0) was dropped; the window starts at turn 1.
        assert_eq!(history[0].content, "turn 1");
        assert_eq!(
            history.last().unwrap().content,
            format!("turn {MAX_HISTORY_TURNS}")
        );
    }

    #[test]
    fn history_limit_returns_most_recent_oldest_first() {
        let manager = ContextManager::new();
        let session = manager.create_session("user-1", None);

        for i in 0..5 {
            manager
                .add_turn(&session.id, ConversationTurn::user(format!("turn {i}")))
                .unwrap();
        }

        let recent = manager.conversation_history(&session.id, Some(3)).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "turn 2");
        assert_eq!(recent[2].content, "turn 4");
    }

    #[tokio::test]
    async fn prune_removes_only_idle_sessions() {
        let manager = ContextManager::new();
        let stale = manager.create_session("user-1", None);
        let active = manager.create_session("user-2", None);
        manager
            .add_turn(&active.id, ConversationTurn::user("keep me"))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        // Touching bumps the activity clock past the cutoff.
        manager.load_session(&active.id).unwrap();

        let pruned = manager.prune_old_sessions(Duration::from_millis(30));
        assert_eq!(pruned, 1);
        assert!(manager.load_session(&stale.id).is_err());

        // The surviving session's history is untouched.
        let history = manager.conversation_history(&active.id, None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "keep me");
    }

    #[test]
    fn relevant_context_includes_preferences_turns_and_metadata() {
        let manager = ContextManager::new();
        let session = manager.create_session("user-1", None);
        manager
            .set_preference(&session.id, "units", json!("metric"))
            .unwrap();
        manager
            .set_metadata(&session.id, "warehouse", json!("east"))
            .unwrap();
        for i in 0..7 {
            manager
                .add_turn(&session.id, ConversationTurn::user(format!("turn {i}")))
                .unwrap();
        }

        let context = manager
            .relevant_context(&session.id, "how much stock is left?")
            .unwrap();

        assert!(context.contains("units"));
        assert!(context.contains("warehouse"));
        // Only the trailing window of turns is quoted.
        assert!(context.contains("turn 6"));
        assert!(!context.contains("turn 0"));
    }

    #[test]
    fn stats_reflect_store_contents() {
        let manager = ContextManager::new();
        let empty = manager.stats();
        assert_eq!(empty.session_count, 0);
        assert_eq!(empty.avg_turns_per_session, 0.0);

        let a = manager.create_session("user-1", None);
        let b = manager.create_session("user-2", None);
        for _ in 0..4 {
            manager.add_turn(&a.id, ConversationTurn::user("hi")).unwrap();
        }
        for _ in 0..2 {
            manager
                .add_turn(&b.id, ConversationTurn::assistant("hello"))
                .unwrap();
        }

        let stats = manager.stats();
        assert_eq!(stats.session_count, 2);
        assert_eq!(stats.total_turns, 6);
        assert_eq!(stats.avg_turns_per_session, 3.0);
    }

    #[tokio::test]
    async fn pruner_sweeps_on_its_interval() {
        let manager = ContextManager::new();
        manager.create_session("user-1", None);

        let pruner = manager.start_pruner(Duration::from_millis(20), Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(80)).await;
        pruner.stop();

        assert_eq!(manager.session_count(), 0);
    }

    #[test]
    fn turn_roles_are_preserved_in_history() {
        let manager = ContextManager::new();
        let session = manager.create_session("user-1", None);
        manager
            .add_turn(&session.id, ConversationTurn::user("question"))
            .unwrap();
        manager
            .add_turn(&session.id, ConversationTurn::assistant("answer"))
            .unwrap();

        let history = manager.conversation_history(&session.id, None).unwrap();
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[1].role, TurnRole::Assistant);
    }
}
