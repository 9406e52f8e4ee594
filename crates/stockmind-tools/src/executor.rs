//! Secure tool execution pipeline.
//!
//! [`ToolExecutor::execute`] runs one tool call through permission checking,
//! input validation, a timeout-bounded handler invocation and output
//! validation, and always returns a [`ToolResult`] envelope. Failures are
//! data, not control flow: nothing in this module raises to the caller.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audit::{AuditInfo, AuditRecord, AuditSink, TracingAuditSink};
use crate::definition::ToolDefinition;
use crate::error::Result;
use crate::handler::HandlerRegistry;
use crate::registry::ToolRegistry;
use crate::schema::{JsonSchema, Schema};

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

/// Capability envelope passed to every tool invocation.
///
/// Describes on whose behalf the call runs. Never persisted beyond the call;
/// the audit block embeds a copy for traceability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub org_id: String,
    pub user_id: String,
    pub session_id: String,
    pub conversation_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionContext {
    /// Create a context for a specific caller.
    pub fn new(
        org_id: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            conversation_id: conversation_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Context for internal calls that have no originating user.
    pub fn system() -> Self {
        Self::new("system", "system", "system", "system")
    }
}

// ---------------------------------------------------------------------------
// Permission resolution
// ---------------------------------------------------------------------------

/// External authorization collaborator.
///
/// Given a user id, returns the permission strings that user holds. The
/// executor requires this set to be a superset of each tool's
/// `required_permissions`.
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    async fn permissions_for(&self, user_id: &str) -> Result<HashSet<String>>;
}

/// Fixed permission table, keyed by user id.
///
/// Useful for tests and for hosts whose authorization data is static at
/// startup. Unknown users hold no permissions.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    grants: std::collections::HashMap<String, HashSet<String>>,
}

impl StaticPermissions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: grant a permission to a user.
    pub fn grant(mut self, user_id: impl Into<String>, permission: impl Into<String>) -> Self {
        self.grants
            .entry(user_id.into())
            .or_default()
            .insert(permission.into());
        self
    }
}

#[async_trait]
impl PermissionResolver for StaticPermissions {
    async fn permissions_for(&self, user_id: &str) -> Result<HashSet<String>> {
        Ok(self.grants.get(user_id).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Result envelope
// ---------------------------------------------------------------------------

/// Machine-readable failure classification for one tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ToolNotFound,
    PermissionDenied,
    ValidationError,
    ExecutionTimeout,
    ExecutionError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ToolNotFound => "TOOL_NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ExecutionTimeout => "EXECUTION_TIMEOUT",
            Self::ExecutionError => "EXECUTION_ERROR",
        };
        write!(f, "{s}")
    }
}

/// Failure payload inside a [`ToolResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFailure {
    pub code: ErrorCode,
    pub message: String,
    /// Structured diagnostics (schema violations, handler details).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Uniform envelope returned by every execution, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    /// Opaque payload on success.
    pub data: Option<Value>,
    /// Failure classification when `success` is false.
    pub error: Option<ToolFailure>,
    /// Wall-clock execution duration.
    pub duration: Duration,
    /// Who ran what, when, on whose behalf.
    pub audit: AuditInfo,
}

impl ToolResult {
    fn ok(data: Option<Value>, duration: Duration, audit: AuditInfo) -> Self {
        Self {
            success: true,
            data,
            error: None,
            duration,
            audit,
        }
    }

    fn fail(failure: ToolFailure, duration: Duration, audit: AuditInfo) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(failure),
            duration,
            audit,
        }
    }
}

// ---------------------------------------------------------------------------
// Options and configuration
// ---------------------------------------------------------------------------

/// Per-call execution options.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Handler deadline; `None` uses the executor default. Clamped to the
    /// configured bounds either way.
    pub timeout: Option<Duration>,
    /// Validate arguments against the tool's input schema.
    pub validate_input: bool,
    /// Validate the payload against the tool's output schema.
    pub validate_output: bool,
    /// Emit an audit record for this call.
    pub audit: bool,
    /// Run every check but skip the handler invocation.
    pub dry_run: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            validate_input: true,
            validate_output: true,
            audit: true,
            dry_run: false,
        }
    }
}

/// Executor-wide configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Deadline applied when a call does not specify one.
    pub default_timeout: Duration,
    /// Lower clamp for per-call timeouts.
    pub min_timeout: Duration,
    /// Upper clamp for per-call timeouts.
    pub max_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            min_timeout: Duration::from_secs(1),
            max_timeout: Duration::from_secs(60),
        }
    }
}

/// One entry of a sequential batch.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub tool_name: String,
    pub arguments: Value,
    pub options: ExecuteOptions,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// State-free execution pipeline over a registry, a handler table, a
/// permission resolver and an audit sink.
///
/// Cheaply cloneable; all fields are shared references.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: ToolRegistry,
    handlers: HandlerRegistry,
    permissions: Arc<dyn PermissionResolver>,
    sink: Arc<dyn AuditSink>,
    config: ExecutorConfig,
}

impl ToolExecutor {
    /// Create an executor with the default tracing audit sink.
    pub fn new(
        registry: ToolRegistry,
        handlers: HandlerRegistry,
        permissions: Arc<dyn PermissionResolver>,
    ) -> Self {
        Self::with_sink(registry, handlers, permissions, Arc::new(TracingAuditSink))
    }

    /// Create an executor with an explicit audit sink.
    pub fn with_sink(
        registry: ToolRegistry,
        handlers: HandlerRegistry,
        permissions: Arc<dyn PermissionResolver>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            registry,
            handlers,
            permissions,
            sink,
            config: ExecutorConfig::default(),
        }
    }

    /// Override the executor configuration.
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute one tool call.
    ///
    /// The pipeline is: lookup, permission check, input validation, handler
    /// invocation raced against a deadline, output validation. Whatever
    /// happens, the caller gets a [`ToolResult`]; this method never errors.
    ///
    /// The deadline race drops the losing future. Tokio cancels it at its
    /// next await point, but a handler that blocks without awaiting keeps
    /// running on its thread; handlers should accept that their result may
    /// be discarded.
    pub async fn execute(
        &self,
        tool_name: &str,
        arguments: Value,
        context: &ExecutionContext,
        options: ExecuteOptions,
    ) -> ToolResult {
        let start = Instant::now();

        // 1. Look up the declarative definition.
        let definition = match self.registry.get(tool_name) {
            Ok(def) => def,
            Err(_) => {
                return self.finish(
                    tool_name,
                    "",
                    context,
                    &options,
                    start,
                    Err(ToolFailure {
                        code: ErrorCode::ToolNotFound,
                        message: format!("tool `{tool_name}` is not registered"),
                        details: None,
                    }),
                );
            }
        };

        // 2. Resolve caller permissions and require the full set.
        if let Err(failure) = self.check_permissions(&definition, context).await {
            return self.finish(tool_name, &definition.version, context, &options, start, Err(failure));
        }

        // 3. Validate arguments against the input schema.
        if options.validate_input
            && let Err(failure) = validate_against(
                &definition.input_schema,
                &arguments,
                &definition.name,
                "input",
            )
        {
            return self.finish(tool_name, &definition.version, context, &options, start, Err(failure));
        }

        // Dry runs stop here: every check has passed, nothing is invoked.
        if options.dry_run {
            tracing::debug!(tool = %tool_name, "dry run, handler skipped");
            return self.finish(tool_name, &definition.version, context, &options, start, Ok(None));
        }

        // 4. Invoke the handler, racing it against the deadline.
        let deadline = self.effective_timeout(&options);
        let outcome = match self.handlers.get(tool_name) {
            None => Err(ToolFailure {
                code: ErrorCode::ExecutionError,
                message: format!("no handler bound for tool `{tool_name}`"),
                details: None,
            }),
            Some(handler) => {
                match tokio::time::timeout(deadline, handler.invoke(arguments, context)).await {
                    Ok(Ok(payload)) => Ok(Some(payload)),
                    Ok(Err(e)) => Err(ToolFailure {
                        code: ErrorCode::ExecutionError,
                        message: e.to_string(),
                        details: None,
                    }),
                    Err(_elapsed) => {
                        tracing::warn!(
                            tool = %tool_name,
                            timeout_ms = deadline.as_millis() as u64,
                            "tool execution timed out"
                        );
                        Err(ToolFailure {
                            code: ErrorCode::ExecutionTimeout,
                            message: format!(
                                "execution exceeded {} ms deadline",
                                deadline.as_millis()
                            ),
                            details: None,
                        })
                    }
                }
            }
        };

        // 5. Validate the payload against the output schema.
        let outcome = match outcome {
            Ok(Some(payload)) if options.validate_output => {
                match validate_against(&definition.output_schema, &payload, &definition.name, "output")
                {
                    Ok(()) => Ok(Some(payload)),
                    Err(failure) => Err(failure),
                }
            }
            other => other,
        };

        self.finish(tool_name, &definition.version, context, &options, start, outcome)
    }

    /// Run batch entries strictly sequentially.
    ///
    /// Stops at the first failing entry unless that entry was a dry run, in
    /// which case the remaining entries still execute. Returns the results
    /// produced up to the stop point.
    pub async fn execute_batch(
        &self,
        entries: Vec<BatchEntry>,
        context: &ExecutionContext,
    ) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(entries.len());

        for entry in entries {
            let dry_run = entry.options.dry_run;
            let result = self
                .execute(&entry.tool_name, entry.arguments, context, entry.options)
                .await;
            let failed = !result.success;
            results.push(result);

            if failed && !dry_run {
                tracing::warn!(
                    tool = %entry.tool_name,
                    completed = results.len(),
                    "batch stopped at first failure"
                );
                break;
            }
        }

        results
    }

    // -- internals ----------------------------------------------------------

    async fn check_permissions(
        &self,
        definition: &ToolDefinition,
        context: &ExecutionContext,
    ) -> std::result::Result<(), ToolFailure> {
        if definition.required_permissions.is_empty() {
            return Ok(());
        }

        let held = self
            .permissions
            .permissions_for(&context.user_id)
            .await
            .map_err(|e| ToolFailure {
                code: ErrorCode::ExecutionError,
                message: format!("permission resolution failed: {e}"),
                details: None,
            })?;

        let missing: Vec<&String> = definition
            .required_permissions
            .iter()
            .filter(|p| !held.contains(*p))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ToolFailure {
                code: ErrorCode::PermissionDenied,
                message: format!(
                    "caller `{}` lacks permissions: {}",
                    context.user_id,
                    missing
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                details: None,
            })
        }
    }

    fn effective_timeout(&self, options: &ExecuteOptions) -> Duration {
        options
            .timeout
            .unwrap_or(self.config.default_timeout)
            .clamp(self.config.min_timeout, self.config.max_timeout)
    }

    /// Build the envelope and emit the audit record.
    fn finish(
        &self,
        tool_name: &str,
        tool_version: &str,
        context: &ExecutionContext,
        options: &ExecuteOptions,
        start: Instant,
        outcome: std::result::Result<Option<Value>, ToolFailure>,
    ) -> ToolResult {
        let duration = start.elapsed();
        let executed_at = Utc::now();

        let audit = AuditInfo {
            tool_name: tool_name.to_string(),
            tool_version: tool_version.to_string(),
            executed_at,
            executed_by: context.user_id.clone(),
            context: context.clone(),
        };

        let result = match outcome {
            Ok(data) => ToolResult::ok(data, duration, audit),
            Err(failure) => ToolResult::fail(failure, duration, audit),
        };

        if options.audit {
            self.sink.record(&AuditRecord {
                tool_name: tool_name.to_string(),
                tool_version: tool_version.to_string(),
                executed_by: context.user_id.clone(),
                session_id: context.session_id.clone(),
                executed_at,
                duration_ms: duration.as_millis() as u64,
                success: result.success,
                error_code: result.error.as_ref().map(|e| e.code.to_string()),
            });
        }

        result
    }
}

/// Compile a schema document and validate a value against it.
///
/// Both compilation and validation failures surface as `VALIDATION_ERROR`
/// with the diagnostics in `details`.
fn validate_against(
    document: &Value,
    value: &Value,
    tool_name: &str,
    direction: &str,
) -> std::result::Result<(), ToolFailure> {
    let schema = JsonSchema::compile(document, &format!("{tool_name}.{direction}")).map_err(|e| {
        ToolFailure {
            code: ErrorCode::ValidationError,
            message: e.to_string(),
            details: None,
        }
    })?;

    schema.validate(value).map_err(|diagnostics| ToolFailure {
        code: ErrorCode::ValidationError,
        message: format!("{direction} failed schema validation: {}", diagnostics.summary()),
        details: serde_json::to_value(&diagnostics).ok(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
