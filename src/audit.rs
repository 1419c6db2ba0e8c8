//! Audit trail for submitted operations.
//!
//! Recording never affects the workflow: the submit task awaits
//! [`AuditLog::record_audit`] after the backend call and only logs a failure.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::config::Config;

/// Keys whose values never reach the audit trail
const SECRET_KEYS: &[&str] = &["pass_pppoe", "pppoe_pass", "noc_password", "password"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Error,
}

/// One audited operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// `create` or `update`
    pub action: String,
    /// `ticket` or `configuration`
    pub target: String,
    pub status: AuditStatus,
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        action: impl Into<String>,
        target: impl Into<String>,
        status: AuditStatus,
        details: Value,
    ) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
            status,
            details: redact(details),
            user_id: None,
            user_name: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.user_name = Some(user_name.into());
        self
    }
}

/// Replace secret values anywhere in `value` with `***`
pub fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| {
                    if SECRET_KEYS.contains(&key.as_str()) {
                        (key, Value::String("***".to_string()))
                    } else {
                        (key, redact(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record_audit(&self, entry: &AuditEntry) -> Result<()>;
}

/// Appends one JSON object per line to a file under the state directory
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.audit_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every entry (used by `netdesk audit`)
    pub async fn read_all(&self) -> Result<Vec<AuditEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read audit log"),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Malformed audit line"))
            .collect()
    }
}

#[async_trait]
impl AuditLog for JsonlAuditLog {
    async fn record_audit(&self, entry: &AuditEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Audit log that discards everything (audit disabled in config)
pub struct NullAuditLog;

#[async_trait]
impl AuditLog for NullAuditLog {
    async fn record_audit(&self, _entry: &AuditEntry) -> Result<()> {
        Ok(())
    }
}

/// Keeps entries in memory; used by tests
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("audit log lock poisoned"))?
            .push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_redact_nested_secrets() {
        let details = json!({
            "olt_name": "OLT-1",
            "request": {
                "customer": {"name": "Ann", "pppoe_pass": "hunter2"},
                "devices": [{"password": "x"}]
            },
            "pass_pppoe": "hunter2"
        });
        let redacted = redact(details);
        let text = redacted.to_string();
        assert!(!text.contains("hunter2"));
        assert_eq!(redacted["request"]["customer"]["name"], "Ann");
        assert_eq!(redacted["pass_pppoe"], "***");
        assert_eq!(redacted["request"]["devices"][0]["password"], "***");
    }

    #[test]
    fn test_status_serialization() {
        let entry = AuditEntry::new("create", "ticket", AuditStatus::Success, json!({}));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status"], "SUCCESS");
        assert!(value.get("user_id").is_none());
    }

    #[tokio::test]
    async fn test_jsonl_appends_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = JsonlAuditLog::new(temp_dir.path().join("nested").join("audit.jsonl"));

        log.record_audit(
            &AuditEntry::new("create", "ticket", AuditStatus::Success, json!({"query": "ann01"}))
                .with_user("u-1", "Rina"),
        )
        .await
        .unwrap();
        log.record_audit(&AuditEntry::new(
            "update",
            "configuration",
            AuditStatus::Error,
            json!({"pass_pppoe": "pw"}),
        ))
        .await
        .unwrap();

        let entries = log.read_all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user_name.as_deref(), Some("Rina"));
        assert_eq!(entries[1].status, AuditStatus::Error);
        assert_eq!(entries[1].details["pass_pppoe"], "***");
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = JsonlAuditLog::new(temp_dir.path().join("audit.jsonl"));
        assert!(log.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_log() {
        let log = MemoryAuditLog::new();
        log.record_audit(&AuditEntry::new("update", "ticket", AuditStatus::Success, json!(null)))
            .await
            .unwrap();
        assert_eq!(log.entries().len(), 1);
    }
}
