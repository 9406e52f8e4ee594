//! Tool layer for the stockmind core.
//!
//! Splits the tool system into three deliberately separate pieces:
//!
//! - [`ToolRegistry`] holds declarative metadata (schemas, permissions,
//!   versions) and nothing executable.
//! - [`HandlerRegistry`] maps tool names to runnable [`ToolHandler`]s.
//! - [`ToolExecutor`] joins the two behind a permission check, schema
//!   validation, a deadline race and an audit trail, always returning a
//!   [`ToolResult`] envelope instead of raising.

pub mod audit;
pub mod definition;
pub mod error;
pub mod executor;
pub mod handler;
pub mod registry;
pub mod schema;

pub use audit::{AuditInfo, AuditRecord, AuditSink, TracingAuditSink};
pub use definition::{AccessLevel, FunctionSchema, ToolDefinition};
pub use error::{Result, ToolsError};
pub use executor::{
    BatchEntry, ErrorCode, ExecuteOptions, ExecutionContext, ExecutorConfig, PermissionResolver,
    StaticPermissions, ToolExecutor, ToolFailure, ToolResult,
};
pub use handler::{HandlerRegistry, ToolHandler};
pub use registry::ToolRegistry;
pub use schema::{JsonSchema, Schema, SchemaDiagnostics, SchemaViolation};
