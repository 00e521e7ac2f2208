//! ArangoDB collection adapter.

use super::{
    ArangoConfig, ArangoHttpClient, CollectionSpec, Document, DocumentApi, DocumentCollection,
    InsertResult,
};
use crate::transport::TransportError;
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// A single ArangoDB collection.
///
/// The collection is created on construction if it does not exist yet, as an
/// edge or document collection according to its [`CollectionSpec`].
///
/// # Thread Safety
///
/// The adapter holds its client behind an `Arc` and has no mutable state, so
/// it can be shared across threads. Callers own any parallelism.
pub struct ArangoCollection {
    api: Arc<dyn DocumentApi>,
    spec: CollectionSpec,
}

impl ArangoCollection {
    /// Connects to the server and ensures the collection exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the server is unreachable, or
    /// [`Error::Collection`] if the collection cannot be created or accessed.
    pub fn connect(config: &ArangoConfig, spec: CollectionSpec) -> Result<Self> {
        let client = ArangoHttpClient::connect(config)?;
        Self::with_api(Arc::new(client), spec)
    }

    /// Wraps an existing client and ensures the collection exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collection`] if the collection cannot be created or accessed.
    pub fn with_api(api: Arc<dyn DocumentApi>, spec: CollectionSpec) -> Result<Self> {
        let collection_error = |source: TransportError| {
            tracing::error!(
                collection = %spec.name,
                error = %source,
                "Failed to create or access collection"
            );
            Error::Collection {
                collection: spec.name.clone(),
                source,
            }
        };

        if !api.has_collection(&spec.name).map_err(collection_error)? {
            api.create_collection(&spec.name, spec.kind)
                .map_err(collection_error)?;
            tracing::debug!(collection = %spec.name, kind = ?spec.kind, "Created collection");
        }

        Ok(Self { api, spec })
    }

    fn read_error(&self, action: String, source: TransportError) -> Error {
        tracing::error!(collection = %self.spec.name, action = %action, error = %source, "Read failed");
        Error::Read {
            action,
            collection: self.spec.name.clone(),
            source,
        }
    }

    fn write_error(&self, action: String, source: TransportError) -> Error {
        tracing::error!(collection = %self.spec.name, action = %action, error = %source, "Write failed");
        Error::Write {
            action,
            collection: self.spec.name.clone(),
            source,
        }
    }
}

impl DocumentCollection for ArangoCollection {
    fn spec(&self) -> &CollectionSpec {
        &self.spec
    }

    fn insert(&self, document: &Document, return_new: bool) -> Result<InsertResult> {
        self.api
            .insert(&self.spec.name, document, return_new)
            .map_err(|e| self.write_error("insert item into".to_string(), e))
    }

    fn get(&self, key: &str) -> Result<Option<Document>> {
        self.api
            .get(&self.spec.name, key)
            .map_err(|e| self.read_error(format!("get item '{key}' from"), e))
    }

    fn update(&self, key: &str, updates: &Document) -> Result<u64> {
        self.api
            .update_match(&self.spec.name, key, updates)
            .map_err(|e| self.write_error(format!("update item '{key}' in"), e))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let deleted = self
            .api
            .delete(&self.spec.name, key)
            .map_err(|e| self.read_error(format!("delete item '{key}' from"), e))?;
        if !deleted {
            tracing::debug!(collection = %self.spec.name, key, "Delete found no document");
        }
        Ok(deleted)
    }

    fn list_all(&self, limit: usize, skip: usize) -> Result<Vec<Document>> {
        self.api
            .all(&self.spec.name, limit, skip)
            .map_err(|e| self.read_error("retrieve documents from".to_string(), e))
    }

    fn query(&self, query: &str, bind_vars: Option<&Document>, count: bool) -> Result<Vec<Value>> {
        let empty = Document::new();
        self.api
            .query(query, bind_vars.unwrap_or(&empty), count)
            .map_err(|e| self.read_error("execute query on".to_string(), e))
    }
}
