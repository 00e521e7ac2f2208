//! # Conduit
//!
//! Thin blocking clients for the three external services our pipelines talk to:
//!
//! - [`document`]: an ArangoDB collection (insert/get/update/delete, paging, AQL)
//! - [`vector`]: a Qdrant collection (idempotent creation, bulk upsert, search)
//! - [`llm`]: OpenAI-compatible chat completion endpoints (text, JSON, images)
//!
//! Every adapter forwards one call to one underlying client call and turns the
//! failure into a typed [`Error`]. There is no retry, caching or pooling layer.
//!
//! ## Example
//!
//! ```rust,ignore
//! use conduit::document::{ArangoCollection, ArangoConfig, CollectionSpec, Document, DocumentCollection};
//!
//! let config = ArangoConfig::new("http://localhost").with_database("pipeline");
//! let articles = ArangoCollection::connect(&config, CollectionSpec::document("articles"))?;
//! let article: Document = serde_json::from_value(json!({"_key": "a1", "title": "Hello"}))?;
//! let meta = articles.insert(article, false)?;
//! let doc = articles.get(&meta.key)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod document;
pub mod llm;
pub mod observability;
pub mod transport;
pub mod vector;

pub use config::ConduitConfig;
pub use document::{ArangoCollection, DocumentCollection};
pub use llm::{LlmClient, LocalOpenAiClient, OpenAiClient};
pub use transport::TransportError;
pub use vector::{QdrantCollection, VectorCollection};

/// Error type for conduit operations.
///
/// Each variant is raised at exactly one kind of call site and chains the
/// underlying failure as its `source`.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Connection` | The document store cannot be reached at construction |
/// | `Collection` | A collection cannot be created or inspected |
/// | `InvalidInput` | Input is rejected before any network call |
/// | `Write` | A document insert or update fails |
/// | `Read` | A document get, delete, listing or query fails |
/// | `Upsert` | A bulk vector upsert fails |
/// | `Search` | A vector search fails |
/// | `Request` | A chat completion call fails, or an image cannot be read |
/// | `Parse` | A chat completion response has no usable content |
/// | `Schema` | Structured output is not valid JSON for the requested type |
/// | `OperationFailed` | Configuration, logging setup or CLI plumbing fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The store could not be reached.
    #[error("failed to connect to {target}")]
    Connection {
        /// Address (and database) that was dialled.
        target: String,
        /// The underlying cause.
        #[source]
        source: TransportError,
    },

    /// A collection could not be created or accessed.
    #[error("failed to create or access collection '{collection}'")]
    Collection {
        /// Collection name.
        collection: String,
        /// The underlying cause.
        #[source]
        source: TransportError,
    },

    /// Invalid input was provided.
    ///
    /// Raised before any network call, e.g. an empty record batch or a vector
    /// record id that is not an unsigned integer.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A document write (insert or update) failed.
    #[error("failed to {action} '{collection}'")]
    Write {
        /// What was attempted, e.g. `insert item into`.
        action: String,
        /// Collection name.
        collection: String,
        /// The underlying cause.
        #[source]
        source: TransportError,
    },

    /// A document read (get, delete, listing or query) failed.
    #[error("failed to {action} '{collection}'")]
    Read {
        /// What was attempted, e.g. `get item 'a1' from`.
        action: String,
        /// Collection name.
        collection: String,
        /// The underlying cause.
        #[source]
        source: TransportError,
    },

    /// A bulk upsert of vector records failed as a whole.
    #[error("failed to upsert records into '{collection}'")]
    Upsert {
        /// Collection name.
        collection: String,
        /// The underlying cause.
        #[source]
        source: TransportError,
    },

    /// A nearest-neighbour search failed.
    #[error("search in '{collection}' failed")]
    Search {
        /// Collection name.
        collection: String,
        /// The underlying cause.
        #[source]
        source: TransportError,
    },

    /// A chat completion request failed.
    #[error("{provider} {operation} request failed")]
    Request {
        /// Client variant name.
        provider: &'static str,
        /// Operation name, e.g. `generate_with_images`.
        operation: &'static str,
        /// The underlying cause.
        #[source]
        source: TransportError,
    },

    /// A chat completion response did not have the expected shape.
    #[error("failed to parse {provider} {operation} response: {reason}")]
    Parse {
        /// Client variant name.
        provider: &'static str,
        /// Operation name.
        operation: &'static str,
        /// What was missing.
        reason: String,
    },

    /// Structured output did not decode into the requested type.
    #[error("invalid JSON structure in model output")]
    Schema {
        /// The decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// An operation outside the adapters failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for conduit operations.
pub type Result<T> = std::result::Result<T, Error>;
