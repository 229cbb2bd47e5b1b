//! Audit sink
//!
//! Append-only execution log written by the rule dispatcher and mutation
//! helpers. The core never reads it back; external audit tooling consumes
//! the collection. Appends are awaited at the call site so the log order
//! matches execution order, but a failed append never fails the caller.

pub mod memory;

pub use memory::InMemoryAuditSink;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error types for audit operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuditError {
    #[error("Audit sink unavailable: {0}")]
    Sink(String),
}

/// One append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// What happened, e.g. `rule_executed`, `milestone_skip_review`
    pub action_type: String,

    /// Entity kind or dispatch context the action applies to
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Structured detail payload (rule id, outcome, record snapshot, ...)
    pub details: Value,

    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action_type: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            user_id: None,
            details: Value::Null,
            timestamp: Utc::now(),
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// Append-only audit log
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError>;
}
