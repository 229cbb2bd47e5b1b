//! MongoDB-backed gateway and audit sink
//!
//! Records live one-document-per-record in collections named by
//! [`Collection::name`], keyed by their application-level `id` field (the
//! Mongo `_id` stays internal and is stripped on the way out).

use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::{info, warn};

use super::{GatewayError, RemoteGateway};
use crate::audit::{AuditEntry, AuditError, AuditSink};
use crate::model::Collection;

fn document_to_value(mut doc: Document) -> Result<Value, GatewayError> {
    doc.remove("_id");
    serde_json::to_value(&doc).map_err(|e| GatewayError::Decode(e.to_string()))
}

fn value_to_document(value: &Value) -> Result<Document, GatewayError> {
    bson::to_document(value).map_err(|e| GatewayError::Rejected(e.to_string()))
}

/// MongoDB remote gateway
#[derive(Clone)]
pub struct MongoGateway {
    db: Database,
}

impl MongoGateway {
    /// Connect and verify the connection with a ping
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, GatewayError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Failed to connect: {}", e)))?;

        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| GatewayError::Unavailable(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(Self { db })
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(collection.name())
    }

    /// Underlying database handle (shared with the audit sink)
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait::async_trait]
impl RemoteGateway for MongoGateway {
    async fn fetch_all(&self, collection: Collection) -> Result<Vec<Value>, GatewayError> {
        let mut cursor = self
            .collection(collection)
            .find(doc! {})
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Find failed: {}", e)))?;

        let mut records = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Cursor error: {}", e)))?
        {
            records.push(document_to_value(doc)?);
        }
        Ok(records)
    }

    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, GatewayError> {
        let mut record = record;
        let object = record
            .as_object_mut()
            .ok_or_else(|| GatewayError::Rejected("record must be a JSON object".to_string()))?;

        let id = match object.get("id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                object.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        let doc = value_to_document(&record)?;
        self.collection(collection)
            .insert_one(doc)
            .await
            .map_err(|e| GatewayError::Rejected(format!("Insert failed: {}", e)))?;

        // Read back the canonical stored record
        let stored = self
            .collection(collection)
            .find_one(doc! { "id": &id })
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Readback failed: {}", e)))?
            .ok_or_else(|| GatewayError::NotFound {
                collection,
                id: id.clone(),
            })?;

        document_to_value(stored)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Value,
    ) -> Result<Value, GatewayError> {
        let patch_doc = value_to_document(&patch)?;

        let updated = self
            .collection(collection)
            .find_one_and_update(doc! { "id": id }, doc! { "$set": patch_doc })
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| GatewayError::Rejected(format!("Update failed: {}", e)))?
            .ok_or_else(|| GatewayError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        document_to_value(updated)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), GatewayError> {
        let result = self
            .collection(collection)
            .delete_one(doc! { "id": id })
            .await
            .map_err(|e| GatewayError::Rejected(format!("Delete failed: {}", e)))?;

        if result.deleted_count == 0 {
            return Err(GatewayError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// Append-only audit log in a MongoDB collection
pub struct MongoAuditSink {
    collection: mongodb::Collection<Document>,
}

impl MongoAuditSink {
    /// Default audit collection name
    pub const COLLECTION: &'static str = "audit_log";

    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Document>(Self::COLLECTION),
        }
    }
}

#[async_trait::async_trait]
impl AuditSink for MongoAuditSink {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let doc = bson::to_document(&entry).map_err(|e| AuditError::Sink(e.to_string()))?;
        self.collection.insert_one(doc).await.map_err(|e| {
            warn!(error = %e, "Audit append failed");
            AuditError::Sink(e.to_string())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_value_round_trip() {
        let value = json!({"id": "opp-1", "amount_sought": 250000.0, "tags": ["a", "b"]});
        let doc = value_to_document(&value).unwrap();
        let back = document_to_value(doc).unwrap();
        assert_eq!(back["id"], "opp-1");
        assert_eq!(back["amount_sought"], 250000.0);
    }

    #[test]
    fn test_empty_patch_still_valid_document() {
        let doc = value_to_document(&json!({})).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_internal_id_is_stripped() {
        let mut doc = Document::new();
        doc.insert("_id", bson::oid::ObjectId::new());
        doc.insert("id", "p-1");
        let value = document_to_value(doc).unwrap();
        assert!(value.get("_id").is_none());
        assert_eq!(value["id"], "p-1");
    }
}
