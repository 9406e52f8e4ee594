//! Audit trail for tool executions.
//!
//! Every execution can be emitted as a structured [`AuditRecord`] to an
//! [`AuditSink`]. The core mandates no storage format beyond the record
//! shape; the default sink forwards records to `tracing` so they land in
//! whatever subscriber the host application installed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::executor::ExecutionContext;

/// Structured description of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Name of the executed tool.
    pub tool_name: String,
    /// Contract version of the executed tool.
    pub tool_version: String,
    /// Who triggered the execution.
    pub executed_by: String,
    /// Session under which the execution ran.
    pub session_id: String,
    /// When the execution finished.
    pub executed_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Whether the execution succeeded.
    pub success: bool,
    /// Machine-readable error code when `success` is false.
    pub error_code: Option<String>,
}

/// Destination for audit records.
///
/// Implementations must not block: records are emitted from the executor's
/// hot path. Buffer internally and flush elsewhere if the backing store is
/// slow.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

/// Default sink that emits records as structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) {
        tracing::info!(
            target: "stockmind::audit",
            tool = %record.tool_name,
            version = %record.tool_version,
            executed_by = %record.executed_by,
            session_id = %record.session_id,
            duration_ms = record.duration_ms,
            success = record.success,
            error_code = record.error_code.as_deref().unwrap_or(""),
            "tool executed"
        );
    }
}

/// Audit block embedded in every [`crate::executor::ToolResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditInfo {
    pub tool_name: String,
    pub tool_version: String,
    pub executed_at: DateTime<Utc>,
    pub executed_by: String,
    pub context: ExecutionContext,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that captures records for assertions.
    #[derive(Default)]
    struct CapturingSink {
        records: Mutex<Vec<AuditRecord>>,
    }

    impl AuditSink for CapturingSink {
        fn record(&self, record: &AuditRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    #[test]
    fn capturing_sink_collects_records() {
        let sink = CapturingSink::default();
        sink.record(&AuditRecord {
            tool_name: "check_inventory".into(),
            tool_version: "1.0.0".into(),
            executed_by: "user-1".into(),
            session_id: "session-1".into(),
            executed_at: Utc::now(),
            duration_ms: 12,
            success: true,
            error_code: None,
        });

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].success);
    }
}
