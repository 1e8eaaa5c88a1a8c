//! Audit log of dapp requests
//!
//! One JSON object per line: a start entry when a request arrives and a
//! completion entry once it has been answered. Signatures and payload results
//! are never written.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bridge::BridgeError;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    request_id: &'a str,
    method: &'a str,
    origin: Option<&'a str>,
    status: &'static str,
    error_code: Option<i32>,
    error: Option<String>,
    duration_ms: u64,
}

struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// JSONL writer for request audit entries
#[derive(Clone)]
pub struct AuditLog {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLog {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter {
                path: log_path.into(),
            })),
        }
    }

    pub async fn request_started(&self, request_id: &str, method: &str, origin: Option<&str>) {
        self.write(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "request_start",
            request_id,
            method,
            origin,
            status: "pending",
            error_code: None,
            error: None,
            duration_ms: 0,
        })
        .await;
    }

    pub async fn request_completed(
        &self,
        request_id: &str,
        method: &str,
        origin: Option<&str>,
        outcome: std::result::Result<(), &BridgeError>,
        duration_ms: u64,
    ) {
        let (status, error_code, error) = match outcome {
            Ok(()) => ("success", None, None),
            Err(e) => ("error", Some(e.code()), Some(e.detail())),
        };

        self.write(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "request_complete",
            request_id,
            method,
            origin,
            status,
            error_code,
            error,
            duration_ms,
        })
        .await;
    }

    async fn write(&self, entry: AuditEntry<'_>) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(&entry) {
            tracing::warn!(error = %e, path = %writer.path.display(), "Failed to write audit log entry");
        }
    }
}
