//! Document/graph store adapter.
//!
//! Wraps a single ArangoDB collection. The adapter is split along the same
//! seam as the other stores in this crate:
//!
//! | Layer | Type | Role |
//! |-------|------|------|
//! | Underlying client | [`DocumentApi`] / [`ArangoHttpClient`] | One method per HTTP call |
//! | Adapter contract | [`DocumentCollection`] | CRUD, paging and AQL on one collection |
//! | Adapter | [`ArangoCollection`] | Ensures the collection exists, maps failures to [`crate::Error`] |
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use conduit::document::{ArangoCollection, ArangoConfig, CollectionSpec, DocumentCollection};
//!
//! let config = ArangoConfig::new("http://localhost").with_credentials("root", "secret");
//! let links = ArangoCollection::connect(&config, CollectionSpec::edge("links"))?;
//!
//! let rows = links.query(
//!     "FOR e IN links FILTER e._from == @from RETURN e",
//!     Some(&bind_vars),
//!     false,
//! )?;
//! ```

mod arango;
mod collection;

pub use arango::{ArangoConfig, ArangoHttpClient};
pub use collection::ArangoCollection;

use crate::Result;
use crate::transport::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A schema-free document: string keys to arbitrary JSON values.
pub type Document = serde_json::Map<String, Value>;

/// Page size used by [`DocumentCollection::list_all`] callers that have no preference.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Whether a collection stores plain documents or graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Standard document collection.
    #[default]
    Document,
    /// Edge collection (documents carry `_from` / `_to`).
    Edge,
}

impl CollectionKind {
    /// The numeric collection type used by the ArangoDB HTTP API.
    #[must_use]
    pub const fn api_type(self) -> u8 {
        match self {
            Self::Document => 2,
            Self::Edge => 3,
        }
    }
}

/// Declares which collection an adapter owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    /// Collection name.
    pub name: String,
    /// Document or edge collection.
    pub kind: CollectionKind,
}

impl CollectionSpec {
    /// A standard document collection.
    #[must_use]
    pub fn document(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CollectionKind::Document,
        }
    }

    /// An edge collection.
    #[must_use]
    pub fn edge(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CollectionKind::Edge,
        }
    }
}

/// Metadata returned for an inserted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertResult {
    /// Document handle (`collection/key`).
    #[serde(rename = "_id")]
    pub id: String,
    /// Document key.
    #[serde(rename = "_key")]
    pub key: String,
    /// Revision.
    #[serde(rename = "_rev")]
    pub rev: String,
    /// The stored document, when `return_new` was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<Document>,
}

/// The underlying document database client.
///
/// Each method maps to exactly one request against the server. Implementations
/// report failures as [`TransportError`] and leave classification to the adapter.
pub trait DocumentApi: Send + Sync {
    /// Returns true if the collection exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn has_collection(&self, name: &str) -> std::result::Result<bool, TransportError>;

    /// Creates a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the creation.
    fn create_collection(
        &self,
        name: &str,
        kind: CollectionKind,
    ) -> std::result::Result<(), TransportError>;

    /// Inserts one document.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn insert(
        &self,
        collection: &str,
        document: &Document,
        return_new: bool,
    ) -> std::result::Result<InsertResult, TransportError>;

    /// Fetches one document by key; `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than "not found".
    fn get(&self, collection: &str, key: &str)
    -> std::result::Result<Option<Document>, TransportError>;

    /// Merges `updates` into every document whose `_key` matches, returning the match count.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    fn update_match(
        &self,
        collection: &str,
        key: &str,
        updates: &Document,
    ) -> std::result::Result<u64, TransportError>;

    /// Deletes one document by key; `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than "not found".
    fn delete(&self, collection: &str, key: &str) -> std::result::Result<bool, TransportError>;

    /// Returns one page of the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn all(
        &self,
        collection: &str,
        limit: usize,
        skip: usize,
    ) -> std::result::Result<Vec<Document>, TransportError>;

    /// Runs an AQL query and drains its cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or any cursor batch fails.
    fn query(
        &self,
        query: &str,
        bind_vars: &Document,
        count: bool,
    ) -> std::result::Result<Vec<Value>, TransportError>;
}

/// Contract of a document collection adapter.
///
/// Implementations own one collection, declared by their [`CollectionSpec`].
pub trait DocumentCollection: Send + Sync {
    /// The collection this adapter owns.
    fn spec(&self) -> &CollectionSpec;

    /// Collection name.
    fn name(&self) -> &str {
        &self.spec().name
    }

    /// Whether the collection is an edge collection.
    fn is_edge_collection(&self) -> bool {
        self.spec().kind == CollectionKind::Edge
    }

    /// Inserts a document. A `_key` field is used if present, otherwise the server generates one.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Write`] if the insert fails.
    fn insert(&self, document: &Document, return_new: bool) -> Result<InsertResult>;

    /// Retrieves a document by key, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Read`] if retrieval fails for any other reason.
    fn get(&self, key: &str) -> Result<Option<Document>>;

    /// Merges the given fields into the document with this key.
    ///
    /// Returns the number of documents updated.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Write`] if the update fails.
    fn update(&self, key: &str, updates: &Document) -> Result<u64>;

    /// Deletes a document by key.
    ///
    /// Returns `false` if no document had that key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Read`] if the deletion fails.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Returns one page of documents.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Read`] if the listing fails.
    fn list_all(&self, limit: usize, skip: usize) -> Result<Vec<Document>>;

    /// Executes an AQL query with named bind parameters.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Read`] if the query fails.
    fn query(&self, query: &str, bind_vars: Option<&Document>, count: bool) -> Result<Vec<Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_kind_api_type() {
        assert_eq!(CollectionKind::Document.api_type(), 2);
        assert_eq!(CollectionKind::Edge.api_type(), 3);
    }

    #[test]
    fn test_insert_result_deserialize() {
        let json = r#"{"_id": "articles/a1", "_key": "a1", "_rev": "_hV2", "new": {"_key": "a1", "title": "t"}}"#;
        let result: InsertResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.key, "a1");
        assert_eq!(result.id, "articles/a1");
        assert!(result.new.is_some_and(|doc| doc.get("title") == Some(&Value::from("t"))));
    }

    #[test]
    fn test_insert_result_without_new() {
        let json = r#"{"_id": "articles/a1", "_key": "a1", "_rev": "_hV2"}"#;
        let result: InsertResult = serde_json::from_str(json).unwrap();
        assert!(result.new.is_none());
    }
}
