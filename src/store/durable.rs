//! Durable cache store backed by sled
//!
//! One sled tree per collection, records keyed by their `id` field and stored
//! as JSON bytes. Persists across process restarts; sled's key ordering gives
//! deterministic `get_all` output.

use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

use super::{key_for, CacheStore, StoreError};
use crate::model::Collection;

/// Sled-backed durable cache store
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open or create the cache database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Opened cache store");
        Ok(Self { db })
    }

    fn tree(&self, collection: Collection) -> Result<sled::Tree, StoreError> {
        Ok(self.db.open_tree(collection.name())?)
    }

    /// Serialize records up front so an encoding problem touches nothing
    fn encode(
        collection: Collection,
        records: &[Value],
    ) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        records
            .iter()
            .map(|record| {
                let key = key_for(collection, record)?;
                let bytes = serde_json::to_vec(record)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok((key, bytes))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl CacheStore for SledStore {
    async fn replace_all(
        &self,
        collection: Collection,
        records: &[Value],
    ) -> Result<(), StoreError> {
        let encoded = Self::encode(collection, records).map_err(|e| {
            warn!(collection = %collection, error = %e, "replace_all rejected payload");
            e
        })?;

        let result: Result<(), StoreError> = (|| {
            let tree = self.tree(collection)?;
            tree.clear()?;
            let mut batch = sled::Batch::default();
            for (key, bytes) in encoded {
                batch.insert(key.as_bytes(), bytes);
            }
            tree.apply_batch(batch)?;
            Ok(())
        })();

        if let Err(ref e) = result {
            warn!(collection = %collection, error = %e, "replace_all failed");
            return result;
        }

        self.db.flush_async().await?;
        Ok(())
    }

    async fn upsert(&self, collection: Collection, record: &Value) -> Result<(), StoreError> {
        let key = key_for(collection, record)?;
        let bytes =
            serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let result: Result<(), StoreError> = (|| {
            self.tree(collection)?.insert(key.as_bytes(), bytes)?;
            Ok(())
        })();

        if let Err(ref e) = result {
            warn!(collection = %collection, error = %e, "upsert failed");
            return result;
        }

        self.db.flush_async().await?;
        Ok(())
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let tree = self.tree(collection)?;
        let mut records = Vec::with_capacity(tree.len());
        for item in tree.iter() {
            let (_, bytes) = item?;
            let record: Value = serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }

    async fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        let result: Result<(), StoreError> = (|| {
            self.tree(collection)?.clear()?;
            Ok(())
        })();

        if let Err(ref e) = result {
            warn!(collection = %collection, error = %e, "clear failed");
        }
        result
    }
}
