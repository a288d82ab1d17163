//! Audit Logging - Tool Invocation Recording
//!
//! Optional append-only record of every tool call: which tool, which
//! instance, the authorization outcome and how long it took. Arguments
//! are recorded as key lists only, never values. Instance names that look
//! like credentials are redacted.
//!
//! # Log Format
//!
//! Each line is a JSON object:
//! ```json
//! {"ts":"2026-01-21T10:30:00Z","type":"tool_call","tool":"delete_workflow","instance":"prod","operation":"delete_workflow","outcome":"denied","success":false,"duration_ms":0,"args_summary":"{keys: [id, instance]}"}
//! ```

use crate::error::AuditError;
use chrono::{DateTime, Utc};
use n8n_gateway_security::{looks_like_secret, OperationType, REDACTED_STRING};
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Recorded in place of a requested instance that is not configured.
pub const UNRECOGNIZED_INSTANCE: &str = "[unrecognized]";

/// How a tool call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    /// Authorized, but validation or the n8n call failed.
    Failed,
    /// Rejected by access control or configuration.
    Denied,
    RateLimited,
}

/// One tool call, as handed to [`AuditLog::record`].
#[derive(Debug, Clone)]
pub struct ToolCallRecord<'a> {
    pub tool: &'a str,
    pub instance: Option<&'a str>,
    pub operation: Option<OperationType>,
    pub outcome: AuditOutcome,
    pub duration_ms: u64,
    pub args: &'a Value,
}

/// Audit log for recording tool calls
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl AuditLog {
    /// Open (or create) the log in append mode
    pub fn new(path: PathBuf) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| AuditError::Open {
                path: path.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn record(&self, call: &ToolCallRecord<'_>) -> Result<(), AuditError> {
        let entry = AuditEntry::ToolCall {
            ts: Utc::now(),
            tool: call.tool.to_string(),
            instance: call.instance.map(recorded_instance),
            operation: call.operation.map(|op| op.as_str()),
            outcome: call.outcome,
            success: call.outcome == AuditOutcome::Success,
            duration_ms: call.duration_ms,
            args_summary: summarize_params(call.args),
        };
        self.write_entry(&entry)
    }

    fn write_entry(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let json = serde_json::to_string(entry)?;

        // A panic mid-write leaves at worst a torn line; keep logging.
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Audit log entry types
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AuditEntry {
    ToolCall {
        ts: DateTime<Utc>,
        tool: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        instance: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation: Option<&'static str>,
        outcome: AuditOutcome,
        success: bool,
        duration_ms: u64,
        args_summary: String,
    },
}

fn recorded_instance(name: &str) -> String {
    if looks_like_secret(name) {
        REDACTED_STRING.to_string()
    } else {
        name.to_string()
    }
}

/// Summarize params for logging (keys only)
fn summarize_params(params: &Value) -> String {
    match params {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
            format!("{{keys: [{}]}}", keys.join(", "))
        }
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Null => "{}".to_string(),
        _ => "[value]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_audit_log_creation() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("audit.ndjson");

        let log = AuditLog::new(path.clone());
        assert!(log.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_record_never_writes_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit.ndjson");
        let log = AuditLog::new(path.clone()).unwrap();

        let args = json!({"id": "wf-secret-id", "apiKey": "n8n_api_0123456789abcdef"});
        log.record(&ToolCallRecord {
            tool: "get_workflow",
            instance: Some("prod"),
            operation: Some(OperationType::ReadWorkflow),
            outcome: AuditOutcome::Success,
            duration_ms: 12,
            args: &args,
        })
        .unwrap();
        log.record(&ToolCallRecord {
            tool: "delete_workflow",
            instance: None,
            operation: Some(OperationType::DeleteWorkflow),
            outcome: AuditOutcome::Denied,
            duration_ms: 0,
            args: &Value::Null,
        })
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("wf-secret-id"));
        assert!(!content.contains("n8n_api_0123456789abcdef"));

        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "tool_call");
        assert_eq!(lines[0]["instance"], "prod");
        assert_eq!(lines[0]["operation"], "read_workflow");
        assert_eq!(lines[0]["success"], true);
        assert_eq!(lines[1]["outcome"], "denied");
        assert!(lines[1].get("instance").is_none());
    }

    #[test]
    fn test_secret_shaped_instance_is_redacted() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit.ndjson");
        let log = AuditLog::new(path.clone()).unwrap();

        log.record(&ToolCallRecord {
            tool: "list_workflows",
            instance: Some("sk-1234567890abcdef1234567890abcdef"),
            operation: Some(OperationType::ReadWorkflow),
            outcome: AuditOutcome::Denied,
            duration_ms: 0,
            args: &json!({"instance": "sk-1234567890abcdef1234567890abcdef"}),
        })
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("sk-1234567890abcdef"));
        let entry: Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(entry["instance"], REDACTED_STRING);
    }

    #[test]
    fn test_appends_across_opens() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit.ndjson");
        for _ in 0..2 {
            let log = AuditLog::new(path.clone()).unwrap();
            log.record(&ToolCallRecord {
                tool: "list_tags",
                instance: None,
                operation: Some(OperationType::ReadWorkflow),
                outcome: AuditOutcome::RateLimited,
                duration_ms: 1,
                args: &json!({}),
            })
            .unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_summarize_params() {
        let obj = json!({"id": "1", "limit": 100});
        let summary = summarize_params(&obj);
        assert!(summary.contains("id"));
        assert!(summary.contains("limit"));
        assert!(!summary.contains("100"));

        assert!(summarize_params(&json!([1, 2, 3])).contains("3 items"));
    }
}
