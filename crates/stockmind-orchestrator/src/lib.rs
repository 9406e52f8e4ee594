//! Request orchestration for the stockmind core.
//!
//! The [`Orchestrator`] is the façade the API layer talks to: it validates
//! requests, loads session state, selects a model provider from a fallback
//! chain, assembles prompts, resolves tool calls through the secure executor
//! and returns an assembled response (or a stream of chunks). It also exposes
//! the planner for multi-step intents and publishes lifecycle events for
//! metrics and audit collectors.

pub mod config;
pub mod error;
pub mod events;
pub mod normalize;
pub mod orchestrator;
pub mod provider;
pub mod request;

pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use events::{Event, EventBus};
pub use normalize::normalize_tool_calls;
pub use orchestrator::{Orchestrator, OrchestratorState};
pub use provider::{
    FallbackChain, ModelProvider, ProviderMessage, ProviderRequest, ProviderResponse, StreamChunk,
    Usage,
};
pub use request::{
    OrchestratorRequest, OrchestratorResponse, RequestOptions, ResponseChunk, ToolCallWithResult,
};
