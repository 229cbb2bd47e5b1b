//! In-memory audit sink (for testing/local development)

use tokio::sync::RwLock;

use super::{AuditEntry, AuditError, AuditSink};

/// Collects audit entries in memory, in append order
#[derive(Default)]
pub struct InMemoryAuditSink {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry appended so far
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}
