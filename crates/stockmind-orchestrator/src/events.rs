//! Lifecycle event bus.
//!
//! Orchestrator state transitions publish [`Event`]s to a lightweight
//! publish/subscribe bus built on [`tokio::sync::broadcast`]. Events are
//! wrapped in [`Arc`] so broadcasting to multiple subscribers does not clone
//! the payload. Metrics and audit collectors subscribe; the core never
//! depends on who is listening.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// A lifecycle event emitted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A request entered the pipeline.
    RequestReceived {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A provider was chosen from the fallback chain.
    ProviderSelected {
        session_id: Uuid,
        provider: String,
    },

    /// The provider answered and tool execution is starting.
    ToolExecutionStarted {
        session_id: Uuid,
        tool_count: usize,
    },

    /// One tool call finished.
    ToolExecutionCompleted {
        session_id: Uuid,
        tool_name: String,
        success: bool,
        duration_ms: u64,
    },

    /// The final response was assembled.
    ResponseGenerated {
        session_id: Uuid,
        provider: String,
        duration_ms: u64,
    },

    /// A request failed; `code` is the machine-readable error tag.
    ErrorOccurred {
        session_id: Uuid,
        code: String,
        message: String,
    },

    /// The orchestrator was shut down by its host.
    Shutdown { timestamp: DateTime<Utc> },
}

/// Publish/subscribe bus for lifecycle events.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`. Subscribers that fall
/// behind by more than the bus capacity observe a `Lagged` error rather than
/// blocking the publisher.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<Event>>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of receivers that will observe it. No subscribers
    /// is not an error; the event is simply dropped.
    pub fn publish(&self, event: Event) -> usize {
        match self.sender.send(Arc::new(event)) {
            Ok(n) => n,
            Err(_) => {
                tracing::trace!("lifecycle event published with no subscribers");
                0
            }
        }
    }

    /// Create a new subscriber receiving all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Event>> {
        self.sender.subscribe()
    }

    /// Current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
