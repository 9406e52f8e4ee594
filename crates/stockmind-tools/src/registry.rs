//! Tool catalog.
//!
//! The registry tracks every [`ToolDefinition`] known to the core. It is a
//! pure in-memory catalog: no side effects beyond the map, and the whole
//! state can be exported and re-imported for snapshotting.
//!
//! Internally the registry is backed by [`DashMap`] which provides lock-free
//! concurrent reads and fine-grained write locking, making it safe to share
//! across tasks without a global `RwLock`. It is constructed explicitly and
//! passed to its consumers; there is no ambient singleton.
//!
//! # Example
//!
//! ```rust
//! # use stockmind_tools::{ToolRegistry, ToolDefinition, AccessLevel};
//! # use serde_json::json;
//! let registry = ToolRegistry::new();
//! registry.register(ToolDefinition::new(
//!     "check_inventory",
//!     "Look up current stock levels",
//!     "inventory",
//!     json!({"type": "object"}),
//!     json!({"type": "object"}),
//!     AccessLevel::ReadOnly,
//! )).unwrap();
//!
//! assert!(registry.contains("check_inventory"));
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::definition::{FunctionSchema, ToolDefinition};
use crate::error::{Result, ToolsError};

/// Concurrent catalog of tool definitions backed by [`DashMap`].
///
/// The registry is cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct ToolRegistry {
    inner: Arc<DashMap<String, ToolDefinition>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Register a new tool definition.
    ///
    /// Definitions are immutable once registered; registering a name that
    /// already exists fails with [`ToolsError::DuplicateTool`] and the
    /// existing definition is retained.
    pub fn register(&self, definition: ToolDefinition) -> Result<()> {
        let name = definition.name.clone();

        use dashmap::mapref::entry::Entry;

        match self.inner.entry(name.clone()) {
            Entry::Occupied(_) => Err(ToolsError::DuplicateTool { name }),
            Entry::Vacant(slot) => {
                tracing::info!(
                    tool = %name,
                    category = %definition.category,
                    version = %definition.version,
                    "tool registered"
                );
                slot.insert(definition);
                Ok(())
            }
        }
    }

    /// Retrieve a snapshot of a definition by name.
    pub fn get(&self, name: &str) -> Result<ToolDefinition> {
        self.inner
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ToolsError::ToolNotFound {
                name: name.to_string(),
            })
    }

    /// Check whether a tool name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Return all definitions, optionally filtered by category.
    pub fn list(&self, category: Option<&str>) -> Vec<ToolDefinition> {
        self.inner
            .iter()
            .filter(|e| category.is_none_or(|c| e.value().category == c))
            .map(|e| e.value().clone())
            .collect()
    }

    /// Return the definitions a caller is allowed to see.
    ///
    /// A tool is visible only when its entire required-permission set is a
    /// subset of `permissions`.
    pub fn list_for_user(
        &self,
        permissions: &HashSet<String>,
        category: Option<&str>,
    ) -> Vec<ToolDefinition> {
        self.inner
            .iter()
            .filter(|e| category.is_none_or(|c| e.value().category == c))
            .filter(|e| {
                e.value()
                    .required_permissions
                    .iter()
                    .all(|p| permissions.contains(p))
            })
            .map(|e| e.value().clone())
            .collect()
    }

    /// Project definitions into provider-agnostic function-call schemas.
    ///
    /// With `names = None` every registered tool is exported; otherwise only
    /// the named tools, silently skipping unknown names.
    pub fn export_schema(&self, names: Option<&[String]>) -> Vec<FunctionSchema> {
        match names {
            None => self
                .inner
                .iter()
                .map(|e| FunctionSchema::from(e.value()))
                .collect(),
            Some(names) => names
                .iter()
                .filter_map(|n| self.inner.get(n.as_str()))
                .map(|e| FunctionSchema::from(e.value()))
                .collect(),
        }
    }

    /// Export the whole catalog for snapshotting.
    pub fn export(&self) -> Vec<ToolDefinition> {
        self.inner.iter().map(|e| e.value().clone()).collect()
    }

    /// Replace the whole catalog with a previously exported snapshot.
    ///
    /// Returns the number of definitions imported. Duplicate names inside the
    /// snapshot itself are rejected before any mutation happens.
    pub fn import(&self, definitions: Vec<ToolDefinition>) -> Result<usize> {
        let mut seen = HashSet::with_capacity(definitions.len());
        for def in &definitions {
            if !seen.insert(def.name.clone()) {
                return Err(ToolsError::DuplicateTool {
                    name: def.name.clone(),
                });
            }
        }

        self.inner.clear();
        let count = definitions.len();
        for def in definitions {
            self.inner.insert(def.name.clone(), def);
        }

        tracing::info!(count, "tool catalog imported");
        Ok(count)
    }

    /// Number of registered tools.
    pub fn count(&self) -> usize {
        self.inner.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
