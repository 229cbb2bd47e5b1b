//! Remote data gateway
//!
//! Contract for the backing relational store. The core always fetches whole
//! collections; there is no pagination or filtering. Records cross the
//! boundary as JSON values with a stable string `id` field.

pub mod memory;
pub mod mongo;

pub use memory::InMemoryGateway;
pub use mongo::{MongoAuditSink, MongoGateway};

use serde_json::Value;

use crate::model::Collection;

/// Error types for gateway operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Remote store unreachable or its read failed
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// Remote store refused the write
    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: Collection, id: String },

    /// Remote payload could not be decoded
    #[error("Malformed remote record: {0}")]
    Decode(String),
}

/// Collection-keyed CRUD against the backing store
///
/// Writes return the canonical record as confirmed by the remote store; the
/// sync engine mirrors exactly that into the cache (write-through, never
/// write-back).
#[async_trait::async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Fetch every record in the collection
    async fn fetch_all(&self, collection: Collection) -> Result<Vec<Value>, GatewayError>;

    /// Insert a record; the remote store may assign the id. Returns the
    /// canonical stored record.
    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, GatewayError>;

    /// Patch named fields on a record. Returns the canonical record after
    /// the patch.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Value,
    ) -> Result<Value, GatewayError>;

    /// Delete a record by id
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), GatewayError>;
}
