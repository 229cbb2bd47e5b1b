//! Engine health surface
//!
//! Sync and rule failures are swallowed on the interactive path, so the
//! engine exposes them here instead: atomic counters plus a broadcast stream
//! of [`EngineEvent`] values that health tooling can subscribe to.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::model::Collection;
use crate::rules::RuleId;

/// Default broadcast channel capacity
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Build identification embedded at compile time
///
/// Used for deployment verification: the commit and timestamp come from the
/// build script, so a running worker can always say what it was built from.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
            commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
            build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        }
    }
}

/// Events emitted by the sync engine and rule dispatcher
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SyncCompleted {
        collection: Collection,
        records: usize,
    },
    SyncFailed {
        collection: Collection,
        error: String,
    },
    RuleExecuted {
        rule: RuleId,
        context: String,
        record_id: Option<String>,
    },
    RuleFailed {
        rule: RuleId,
        context: String,
        record_id: Option<String>,
        error: String,
    },
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub collections_synced: u64,
    pub sync_failures: u64,
    pub rules_executed: u64,
    pub rule_failures: u64,
    pub audit_append_failures: u64,
}

/// Shared health surface: counters + event stream
pub struct Health {
    collections_synced: AtomicU64,
    sync_failures: AtomicU64,
    rules_executed: AtomicU64,
    rule_failures: AtomicU64,
    audit_append_failures: AtomicU64,
    events: broadcast::Sender<EngineEvent>,
}

impl Health {
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            collections_synced: AtomicU64::new(0),
            sync_failures: AtomicU64::new(0),
            rules_executed: AtomicU64::new(0),
            rule_failures: AtomicU64::new(0),
            audit_append_failures: AtomicU64::new(0),
            events,
        }
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            collections_synced: self.collections_synced.load(Ordering::Relaxed),
            sync_failures: self.sync_failures.load(Ordering::Relaxed),
            rules_executed: self.rules_executed.load(Ordering::Relaxed),
            rule_failures: self.rule_failures.load(Ordering::Relaxed),
            audit_append_failures: self.audit_append_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_sync_completed(&self, collection: Collection, records: usize) {
        self.collections_synced.fetch_add(1, Ordering::Relaxed);
        self.emit(EngineEvent::SyncCompleted {
            collection,
            records,
        });
    }

    pub(crate) fn record_sync_failed(&self, collection: Collection, error: &str) {
        self.sync_failures.fetch_add(1, Ordering::Relaxed);
        self.emit(EngineEvent::SyncFailed {
            collection,
            error: error.to_string(),
        });
    }

    pub(crate) fn record_rule_executed(&self, rule: RuleId, context: &str, record_id: Option<&str>) {
        self.rules_executed.fetch_add(1, Ordering::Relaxed);
        self.emit(EngineEvent::RuleExecuted {
            rule,
            context: context.to_string(),
            record_id: record_id.map(str::to_string),
        });
    }

    pub(crate) fn record_rule_failed(
        &self,
        rule: RuleId,
        context: &str,
        record_id: Option<&str>,
        error: &str,
    ) {
        self.rule_failures.fetch_add(1, Ordering::Relaxed);
        self.emit(EngineEvent::RuleFailed {
            rule,
            context: context.to_string(),
            record_id: record_id.map(str::to_string),
            error: error.to_string(),
        });
    }

    pub(crate) fn record_audit_append_failure(&self) {
        self.audit_append_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn emit(&self, event: EngineEvent) {
        // No receivers is fine; the stream is opt-in
        let _ = self.events.send(event);
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counters_and_events() {
        let health = Health::default();
        let mut events = health.subscribe();

        health.record_sync_completed(Collection::Opportunities, 3);
        health.record_sync_failed(Collection::Payments, "down");

        let snapshot = health.snapshot();
        assert_eq!(snapshot.collections_synced, 1);
        assert_eq!(snapshot.sync_failures, 1);

        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::SyncCompleted { records: 3, .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::SyncFailed { .. }
        ));
    }

    #[test]
    fn test_emit_without_subscribers_is_harmless() {
        let health = Health::default();
        health.record_rule_executed(RuleId::HighRiskAlert, "opportunity_update", Some("o-1"));
        assert_eq!(health.snapshot().rules_executed, 1);
    }

    #[test]
    fn test_build_info_is_populated() {
        let info = BuildInfo::current();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert!(!info.commit.is_empty());
        assert!(!info.build_time.is_empty());
    }
}
