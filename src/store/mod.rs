//! Entity cache store
//!
//! Durable, collection-keyed local mirror of remote records. The store never
//! originates writes on its own: the sync engine owns the write path and the
//! store only persists what the gateway has already confirmed.
//!
//! Failure policy: a failed storage operation is logged as a warning and
//! returns an error; prior contents are left as they were. Callers must not
//! assume a failed `replace_all` cleared anything.

pub mod durable;
pub mod memory;

pub use durable::SledStore;
pub use memory::MemoryStore;

use serde_json::Value;

use crate::model::Collection;

/// Error types for cache store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying storage backend failed
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Record has no string `id` field to key it by
    #[error("Record in '{0}' is missing a string `id` field")]
    MissingId(Collection),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Collection-keyed record storage
///
/// Implementations key records by their `id` field and return them in id
/// order, so two stores holding the same records always produce identical
/// `get_all` output.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Replace the whole collection with the given records.
    ///
    /// Atomic from the caller's point of view: encoding problems are caught
    /// before anything is cleared.
    async fn replace_all(&self, collection: Collection, records: &[Value])
        -> Result<(), StoreError>;

    /// Insert or overwrite a single record, keyed by its `id` field
    async fn upsert(&self, collection: Collection, record: &Value) -> Result<(), StoreError>;

    /// All records in the collection, ordered by id
    async fn get_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError>;

    /// Remove every record in the collection
    async fn clear(&self, collection: Collection) -> Result<(), StoreError>;
}

/// Extract the id key for a record, or fail with the collection it belongs to
pub(crate) fn key_for(collection: Collection, record: &Value) -> Result<String, StoreError> {
    crate::model::record_id(record)
        .map(|id| id.to_string())
        .ok_or(StoreError::MissingId(collection))
}
