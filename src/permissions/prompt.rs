//! Permission prompts
//!
//! In the extension a prompt is a popup window the user approves or closes.
//! Here it is a trait with a fixed-answer implementation and an interactive
//! terminal one.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use super::PermissionKind;
use crate::{Error, Result};

/// What the user is shown
#[derive(Debug, Clone, Serialize)]
pub struct PermissionRequest {
    pub id: Uuid,
    pub kind: PermissionKind,
    pub origin: String,
    pub address: String,
    /// Payload or message being approved, if any
    pub detail: Option<Value>,
}

impl PermissionRequest {
    pub fn new(
        kind: PermissionKind,
        origin: impl Into<String>,
        address: impl Into<String>,
        detail: Option<Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            origin: origin.into(),
            address: address.into(),
            detail,
        }
    }
}

#[async_trait]
pub trait PermissionPrompter: Send + Sync {
    /// `Ok(true)` when the user approves
    async fn prompt(&self, request: &PermissionRequest) -> Result<bool>;
}

/// Answers from a fixed set of approved kinds
#[derive(Debug, Default)]
pub struct StaticPrompter {
    approved: HashSet<PermissionKind>,
    prompts: AtomicUsize,
}

impl StaticPrompter {
    pub fn approving(kinds: impl IntoIterator<Item = PermissionKind>) -> Self {
        Self {
            approved: kinds.into_iter().collect(),
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn approve_all() -> Self {
        Self::approving(PermissionKind::ALL)
    }

    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Number of prompts answered so far
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionPrompter for StaticPrompter {
    async fn prompt(&self, request: &PermissionRequest) -> Result<bool> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        Ok(self.approved.contains(&request.kind))
    }
}

/// Asks on the controlling terminal
///
/// Uses the tty rather than stdin so it works while stdin carries requests.
#[derive(Debug, Clone)]
pub struct TerminalPrompter {
    tty: PathBuf,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            tty: PathBuf::from("/dev/tty"),
        }
    }

    fn question(request: &PermissionRequest) -> String {
        let mut text = format!(
            "{} requests '{}' for account {}",
            request.origin,
            request.kind.name(),
            request.address
        );
        if let Some(detail) = &request.detail {
            text.push_str(&format!("\n  {}", detail));
        }
        text.push_str("\nApprove? [y/N] ");
        text
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionPrompter for TerminalPrompter {
    async fn prompt(&self, request: &PermissionRequest) -> Result<bool> {
        let tty = self.tty.clone();
        let question = Self::question(request);

        tokio::task::spawn_blocking(move || -> Result<bool> {
            let mut terminal = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open(&tty)?;
            terminal.write_all(question.as_bytes())?;
            terminal.flush()?;

            let mut answer = String::new();
            BufReader::new(terminal).read_line(&mut answer)?;
            Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
        })
        .await
        .map_err(|e| Error::InvalidArgument(format!("prompt task failed: {}", e)))?
    }
}
