//! In-memory cache store (for testing/local development)

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{key_for, CacheStore, StoreError};
use crate::model::Collection;

/// Simple in-memory cache store
///
/// Not durable across restarts; used in tests and dev setups where the
/// durable sled store is not wanted.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryStore {
    async fn replace_all(
        &self,
        collection: Collection,
        records: &[Value],
    ) -> Result<(), StoreError> {
        // Key everything up front so a bad record leaves prior contents alone
        let mut keyed = BTreeMap::new();
        for record in records {
            keyed.insert(key_for(collection, record)?, record.clone());
        }

        self.collections.write().await.insert(collection, keyed);
        Ok(())
    }

    async fn upsert(&self, collection: Collection, record: &Value) -> Result<(), StoreError> {
        let key = key_for(collection, record)?;
        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .insert(key, record.clone());
        Ok(())
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        self.collections.write().await.remove(&collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replace_all_and_get_all() {
        let store = MemoryStore::new();
        let records = vec![json!({"id": "b"}), json!({"id": "a"})];

        store
            .replace_all(Collection::Opportunities, &records)
            .await
            .unwrap();

        let all = store.get_all(Collection::Opportunities).await.unwrap();
        assert_eq!(all.len(), 2);
        // Ordered by id regardless of insertion order
        assert_eq!(all[0]["id"], "a");
        assert_eq!(all[1]["id"], "b");
    }

    #[tokio::test]
    async fn test_replace_all_rejects_missing_id_without_clearing() {
        let store = MemoryStore::new();
        store
            .replace_all(Collection::Payments, &[json!({"id": "p-1"})])
            .await
            .unwrap();

        let result = store
            .replace_all(Collection::Payments, &[json!({"amount": 10})])
            .await;
        assert!(matches!(result, Err(StoreError::MissingId(_))));

        // Prior contents untouched
        let all = store.get_all(Collection::Payments).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["id"], "p-1");
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let store = MemoryStore::new();
        store
            .upsert(Collection::Offers, &json!({"id": "o-1", "amount": 100}))
            .await
            .unwrap();
        store
            .upsert(Collection::Offers, &json!({"id": "o-1", "amount": 250}))
            .await
            .unwrap();

        let all = store.get_all(Collection::Offers).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["amount"], 250);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::new();
        store
            .upsert(Collection::Offers, &json!({"id": "o-1"}))
            .await
            .unwrap();
        store.clear(Collection::Offers).await.unwrap();
        assert!(store.get_all(Collection::Offers).await.unwrap().is_empty());
    }
}
