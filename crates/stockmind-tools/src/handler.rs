//! Executable tool handlers.
//!
//! The registry holds declarative metadata only; the mapping from tool name
//! to runnable code lives here. Keeping the two apart lets a catalog be
//! exported, diffed and imported without ever touching an implementation,
//! and lets tests swap handlers freely.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::error::Result;
use crate::executor::ExecutionContext;

/// Trait for components that can execute a tool on behalf of a caller.
///
/// Handlers receive the raw JSON arguments (already validated against the
/// tool's input schema when validation is enabled) and the capability
/// envelope for the invocation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool and return its payload.
    async fn invoke(&self, arguments: Value, context: &ExecutionContext) -> Result<Value>;
}

/// Concurrent map from tool name to handler implementation.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    inner: Arc<DashMap<String, Arc<dyn ToolHandler>>>,
}

impl HandlerRegistry {
    /// Create an empty handler registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Bind a handler to a tool name. Re-binding replaces the previous
    /// handler; the declarative definition is unaffected.
    pub fn bind(&self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        let name = name.into();
        tracing::debug!(tool = %name, "handler bound");
        self.inner.insert(name, handler);
    }

    /// Look up the handler for a tool name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.inner.get(name).map(|e| e.value().clone())
    }

    /// Remove a binding, returning the handler if it existed.
    pub fn unbind(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.inner.remove(name).map(|(_, h)| h)
    }

    /// Number of bound handlers.
    pub fn count(&self) -> usize {
        self.inner.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn invoke(&self, arguments: Value, _context: &ExecutionContext) -> Result<Value> {
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn bind_and_invoke() {
        let handlers = HandlerRegistry::new();
        handlers.bind("echo", Arc::new(EchoHandler));

        let handler = handlers.get("echo").expect("handler bound");
        let ctx = ExecutionContext::system();
        let result = handler.invoke(json!({"hello": "world"}), &ctx).await.unwrap();
        assert_eq!(result["hello"], "world");
    }

    #[test]
    fn unbind_removes_handler() {
        let handlers = HandlerRegistry::new();
        handlers.bind("echo", Arc::new(EchoHandler));
        assert_eq!(handlers.count(), 1);

        assert!(handlers.unbind("echo").is_some());
        assert_eq!(handlers.count(), 0);
        assert!(handlers.get("echo").is_none());
    }
}
