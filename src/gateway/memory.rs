//! In-memory gateway (for testing/local development)
//!
//! Behaves like a tiny remote store with injectable failures, so sync and
//! dispatch behavior can be exercised without a running MongoDB.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{GatewayError, RemoteGateway};
use crate::model::{record_id, Collection};

/// Simple in-memory remote gateway
#[derive(Default)]
pub struct InMemoryGateway {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Value>>>,
    /// Collections whose fetches currently fail
    failing_fetches: RwLock<HashSet<Collection>>,
    /// When set, every write is rejected
    reject_writes: AtomicBool,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection with records (replaces existing contents)
    pub async fn seed(&self, collection: Collection, records: Vec<Value>) {
        let mut keyed = BTreeMap::new();
        for record in records {
            if let Some(id) = record_id(&record) {
                keyed.insert(id.to_string(), record.clone());
            }
        }
        self.collections.write().await.insert(collection, keyed);
    }

    /// Make fetches for a collection fail (or succeed again)
    pub async fn set_fetch_failure(&self, collection: Collection, failing: bool) {
        let mut failures = self.failing_fetches.write().await;
        if failing {
            failures.insert(collection);
        } else {
            failures.remove(&collection);
        }
    }

    /// Reject every write until cleared
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::Relaxed);
    }

    /// Direct peek at stored records (test assertions)
    pub async fn records(&self, collection: Collection) -> Vec<Value> {
        self.collections
            .read()
            .await
            .get(&collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    fn check_writes(&self) -> Result<(), GatewayError> {
        if self.reject_writes.load(Ordering::Relaxed) {
            Err(GatewayError::Rejected("writes disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl RemoteGateway for InMemoryGateway {
    async fn fetch_all(&self, collection: Collection) -> Result<Vec<Value>, GatewayError> {
        if self.failing_fetches.read().await.contains(&collection) {
            return Err(GatewayError::Unavailable(format!(
                "fetch of '{}' failed",
                collection
            )));
        }
        Ok(self.records(collection).await)
    }

    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, GatewayError> {
        self.check_writes()?;

        let mut record = record;
        let object = record
            .as_object_mut()
            .ok_or_else(|| GatewayError::Rejected("record must be a JSON object".to_string()))?;

        // Assign an id when the caller left it to the store
        let id = match object.get("id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                object.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .insert(id, record.clone());

        Ok(record)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Value,
    ) -> Result<Value, GatewayError> {
        self.check_writes()?;

        let patch_object = patch
            .as_object()
            .ok_or_else(|| GatewayError::Rejected("patch must be a JSON object".to_string()))?;

        let mut collections = self.collections.write().await;
        let record = collections
            .entry(collection)
            .or_default()
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        let object = record
            .as_object_mut()
            .ok_or_else(|| GatewayError::Decode("stored record is not an object".to_string()))?;
        for (key, value) in patch_object {
            object.insert(key.clone(), value.clone());
        }

        Ok(record.clone())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), GatewayError> {
        self.check_writes()?;

        let removed = self
            .collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .remove(id);

        match removed {
            Some(_) => Ok(()),
            None => Err(GatewayError::NotFound {
                collection,
                id: id.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let gateway = InMemoryGateway::new();
        let stored = gateway
            .insert(Collection::Offers, json!({"amount": 100.0}))
            .await
            .unwrap();
        assert!(record_id(&stored).is_some());
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let gateway = InMemoryGateway::new();
        gateway
            .seed(
                Collection::Payments,
                vec![json!({"id": "p-1", "status": "pending_proof", "amount": 50.0})],
            )
            .await;

        let updated = gateway
            .update(Collection::Payments, "p-1", json!({"status": "verified"}))
            .await
            .unwrap();
        assert_eq!(updated["status"], "verified");
        assert_eq!(updated["amount"], 50.0);
    }

    #[tokio::test]
    async fn test_fetch_failure_switch() {
        let gateway = InMemoryGateway::new();
        gateway
            .set_fetch_failure(Collection::Opportunities, true)
            .await;

        let result = gateway.fetch_all(Collection::Opportunities).await;
        assert!(matches!(result, Err(GatewayError::Unavailable(_))));

        gateway
            .set_fetch_failure(Collection::Opportunities, false)
            .await;
        assert!(gateway.fetch_all(Collection::Opportunities).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let gateway = InMemoryGateway::new();
        let result = gateway
            .update(Collection::Agreements, "missing", json!({"status": "executed"}))
            .await;
        assert!(matches!(result, Err(GatewayError::NotFound { .. })));
    }
}
