//! Vector store adapter.
//!
//! Wraps a single Qdrant collection with a fixed dimensionality and distance
//! metric.
//!
//! | Layer | Type | Role |
//! |-------|------|------|
//! | Underlying client | [`VectorApi`] / [`QdrantHttpClient`] | One method per REST call |
//! | Adapter contract | [`VectorCollection`] | Create, upsert, search on one collection |
//! | Adapter | [`QdrantCollection`] | Input checks, id coercion, error mapping |
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use conduit::vector::{QdrantCollection, QdrantConfig, VectorCollection, VectorCollectionSpec, VectorRecord};
//!
//! let chunks = QdrantCollection::new(&QdrantConfig::default(), VectorCollectionSpec::new("chunks", 384));
//! chunks.create_collection()?;
//! chunks.add_records(&[VectorRecord::new(7_u64, embedding)])?;
//!
//! for hit in chunks.search(&query, 5, None, Some(0.75))? {
//!     println!("{:?}: {:.3}", hit.id, hit.score);
//! }
//! ```
//!
//! # Payload Filters
//!
//! [`VectorCollection::search`] accepts a [`PayloadFilter`] but does not send
//! it to the server. Results are not narrowed by payload.

mod collection;
mod qdrant;

pub use collection::QdrantCollection;
pub use qdrant::{QdrantConfig, QdrantHttpClient};

use crate::Result;
use crate::transport::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Metadata stored alongside a vector.
pub type Payload = serde_json::Map<String, Value>;

/// Number of neighbours returned when the caller has no preference.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Distance metric of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Distance {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Euclidean distance.
    Euclid,
    /// Dot product.
    Dot,
    /// Manhattan distance.
    Manhattan,
}

impl Distance {
    /// Whether larger scores mean closer neighbours for this metric.
    #[must_use]
    pub const fn higher_is_better(self) -> bool {
        matches!(self, Self::Cosine | Self::Dot)
    }

    /// Whether `score` satisfies `threshold` in this metric's direction.
    #[must_use]
    pub fn meets_threshold(self, score: f32, threshold: f32) -> bool {
        if self.higher_is_better() {
            score >= threshold
        } else {
            score <= threshold
        }
    }

    /// Parses a metric name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(Self::Cosine),
            "euclid" | "euclidean" => Some(Self::Euclid),
            "dot" => Some(Self::Dot),
            "manhattan" => Some(Self::Manhattan),
            _ => None,
        }
    }
}

/// Declares which collection an adapter owns and how it is shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorCollectionSpec {
    /// Collection name.
    pub name: String,
    /// Dimensionality of every stored vector.
    pub vector_size: usize,
    /// Distance metric.
    pub distance: Distance,
}

impl VectorCollectionSpec {
    /// A collection with cosine distance.
    #[must_use]
    pub fn new(name: impl Into<String>, vector_size: usize) -> Self {
        Self {
            name: name.into(),
            vector_size,
            distance: Distance::default(),
        }
    }

    /// Sets the distance metric.
    #[must_use]
    pub const fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }
}

/// Vector configuration sent when a collection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VectorParams {
    /// Dimensionality.
    pub size: usize,
    /// Distance metric.
    pub distance: Distance,
}

/// Identifier of an input record, before coercion to a point id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric id.
    Num(u64),
    /// Textual id; must parse as an unsigned integer.
    Text(String),
}

impl RecordId {
    /// Coerces the id to the integer form stored in the collection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if a textual id is not an unsigned integer.
    pub fn to_point_id(&self) -> Result<u64> {
        match self {
            Self::Num(n) => Ok(*n),
            Self::Text(s) => s.trim().parse().map_err(|_| {
                crate::Error::InvalidInput(format!("record id '{s}' is not an unsigned integer"))
            }),
        }
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self::Num(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// A vector with its id and optional payload, as supplied by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Record id.
    pub id: RecordId,
    /// Embedding; its length must match the collection's dimensionality.
    pub vector: Vec<f32>,
    /// Metadata; stored as `{}` when absent.
    #[serde(default)]
    pub payload: Option<Payload>,
}

impl VectorRecord {
    /// Creates a record without payload.
    #[must_use]
    pub fn new(id: impl Into<RecordId>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            payload: None,
        }
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// A point as stored in the collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    /// Point id.
    pub id: u64,
    /// Embedding.
    pub vector: Vec<f32>,
    /// Metadata.
    pub payload: Payload,
}

/// Nearest-neighbour query sent to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    /// Query embedding.
    pub vector: Vec<f32>,
    /// Maximum number of results.
    pub limit: usize,
    /// Always true: payloads are returned with every hit.
    pub with_payload: bool,
    /// Minimum score, interpreted by the store according to the distance metric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f32>,
}

/// Point id as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    /// Numeric id.
    Num(u64),
    /// UUID id.
    Uuid(String),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Uuid(s) => f.write_str(s),
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// Point id.
    pub id: PointId,
    /// Point payload (`{}` if the point has none).
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payload: Payload,
    /// Similarity score.
    pub score: f32,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Payload, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Payload>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payload filter in the store's native JSON filter syntax.
///
/// Accepted by [`VectorCollection::search`] but not applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadFilter(pub Value);

/// The underlying vector database client.
pub trait VectorApi: Send + Sync {
    /// Lists the names of all collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn collection_names(&self) -> std::result::Result<Vec<String>, TransportError>;

    /// Creates a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the creation.
    fn create_collection(
        &self,
        name: &str,
        params: VectorParams,
    ) -> std::result::Result<(), TransportError>;

    /// Inserts or replaces points in one request.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    fn upsert(&self, collection: &str, points: &[Point]) -> std::result::Result<(), TransportError>;

    /// Runs a nearest-neighbour search.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    fn search(
        &self,
        collection: &str,
        request: &SearchRequest,
    ) -> std::result::Result<Vec<ScoredRecord>, TransportError>;
}

/// Contract of a vector collection adapter.
pub trait VectorCollection: Send + Sync {
    /// The collection this adapter owns.
    fn spec(&self) -> &VectorCollectionSpec;

    /// Collection name.
    fn name(&self) -> &str {
        &self.spec().name
    }

    /// Dimensionality of stored vectors.
    fn vector_size(&self) -> usize {
        self.spec().vector_size
    }

    /// Distance metric.
    fn distance(&self) -> Distance {
        self.spec().distance
    }

    /// Creates the collection if it does not already exist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Collection`] if listing or creation fails.
    fn create_collection(&self) -> Result<()>;

    /// Upserts records in a single request.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for an empty batch or a
    /// non-numeric id (before any network call), or [`crate::Error::Upsert`]
    /// if the store rejects the batch.
    fn add_records(&self, records: &[VectorRecord]) -> Result<()>;

    /// Returns the nearest neighbours of `query_vector`, best first.
    ///
    /// `filter` is accepted but not applied.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Search`] if the search fails.
    fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        filter: Option<&PayloadFilter>,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(RecordId::Num(42), Some(42) ; "numeric")]
    #[test_case(RecordId::Text("42".to_string()), Some(42) ; "numeric text")]
    #[test_case(RecordId::Text(" 7 ".to_string()), Some(7) ; "padded text")]
    #[test_case(RecordId::Text("abc".to_string()), None ; "non numeric text")]
    #[test_case(RecordId::Text("-1".to_string()), None ; "negative text")]
    fn test_record_id_coercion(id: RecordId, expected: Option<u64>) {
        assert_eq!(id.to_point_id().ok(), expected);
    }

    #[test_case(Distance::Cosine, 0.8, 0.5, true)]
    #[test_case(Distance::Cosine, 0.4, 0.5, false)]
    #[test_case(Distance::Dot, 0.5, 0.5, true)]
    #[test_case(Distance::Euclid, 0.4, 0.5, true)]
    #[test_case(Distance::Euclid, 0.8, 0.5, false)]
    #[test_case(Distance::Manhattan, 2.0, 1.0, false)]
    fn test_meets_threshold(distance: Distance, score: f32, threshold: f32, expected: bool) {
        assert_eq!(distance.meets_threshold(score, threshold), expected);
    }

    #[test]
    fn test_distance_wire_names() {
        let params = VectorParams {
            size: 384,
            distance: Distance::Cosine,
        };
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            serde_json::json!({"size": 384, "distance": "Cosine"})
        );
        assert_eq!(Distance::parse("EUCLIDEAN"), Some(Distance::Euclid));
        assert_eq!(Distance::parse("hamming"), None);
    }

    #[test]
    fn test_record_deserialize_mixed_ids() {
        let records: Vec<VectorRecord> = serde_json::from_str(
            r#"[{"id": 1, "vector": [0.1]}, {"id": "2", "vector": [0.2], "payload": {"k": "v"}}]"#,
        )
        .unwrap();
        assert_eq!(records[0].id, RecordId::Num(1));
        assert_eq!(records[1].id, RecordId::Text("2".to_string()));
        assert!(records[0].payload.is_none());
    }

    #[test]
    fn test_scored_record_null_payload() {
        let hit: ScoredRecord =
            serde_json::from_str(r#"{"id": 3, "version": 1, "score": 0.9, "payload": null}"#).unwrap();
        assert_eq!(hit.id, PointId::Num(3));
        assert!(hit.payload.is_empty());
    }

    #[test]
    fn test_search_request_omits_missing_threshold() {
        let request = SearchRequest {
            vector: vec![0.1, 0.2],
            limit: 10,
            with_payload: true,
            score_threshold: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("score_threshold").is_none());
        assert!(value.get("filter").is_none());
    }
}
