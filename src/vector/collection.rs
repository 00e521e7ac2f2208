//! Qdrant collection adapter.

use super::{
    PayloadFilter, Point, QdrantConfig, QdrantHttpClient, ScoredRecord, SearchRequest, VectorApi,
    VectorCollection, VectorCollectionSpec, VectorParams, VectorRecord,
};
use crate::transport::TransportError;
use crate::{Error, Result};
use std::sync::Arc;

/// A single Qdrant collection.
///
/// Construction does not touch the network; call
/// [`create_collection`](VectorCollection::create_collection) before the first
/// upsert if the collection may not exist.
pub struct QdrantCollection {
    api: Arc<dyn VectorApi>,
    spec: VectorCollectionSpec,
}

impl QdrantCollection {
    /// Creates an adapter talking to the configured server.
    #[must_use]
    pub fn new(config: &QdrantConfig, spec: VectorCollectionSpec) -> Self {
        Self::with_api(Arc::new(QdrantHttpClient::new(config)), spec)
    }

    /// Creates an adapter over an existing client.
    #[must_use]
    pub fn with_api(api: Arc<dyn VectorApi>, spec: VectorCollectionSpec) -> Self {
        Self { api, spec }
    }

    fn to_points(records: &[VectorRecord]) -> Result<Vec<Point>> {
        records
            .iter()
            .map(|record| {
                Ok(Point {
                    id: record.id.to_point_id()?,
                    vector: record.vector.clone(),
                    payload: record.payload.clone().unwrap_or_default(),
                })
            })
            .collect()
    }

    fn collection_error(&self, source: TransportError) -> Error {
        tracing::error!(collection = %self.spec.name, error = %source, "Failed to create collection");
        Error::Collection {
            collection: self.spec.name.clone(),
            source,
        }
    }
}

impl VectorCollection for QdrantCollection {
    fn spec(&self) -> &VectorCollectionSpec {
        &self.spec
    }

    fn create_collection(&self) -> Result<()> {
        let names = self
            .api
            .collection_names()
            .map_err(|e| self.collection_error(e))?;

        if names.iter().any(|name| *name == self.spec.name) {
            tracing::debug!(collection = %self.spec.name, "Collection already exists");
            return Ok(());
        }

        let params = VectorParams {
            size: self.spec.vector_size,
            distance: self.spec.distance,
        };
        self.api
            .create_collection(&self.spec.name, params)
            .map_err(|e| self.collection_error(e))?;

        tracing::debug!(
            collection = %self.spec.name,
            size = params.size,
            distance = ?params.distance,
            "Created collection"
        );
        Ok(())
    }

    fn add_records(&self, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Err(Error::InvalidInput(
                "No records provided for upsert.".to_string(),
            ));
        }

        let points = Self::to_points(records)?;

        self.api
            .upsert(&self.spec.name, &points)
            .map_err(|source| {
                tracing::error!(
                    collection = %self.spec.name,
                    count = points.len(),
                    error = %source,
                    "Upsert failed"
                );
                Error::Upsert {
                    collection: self.spec.name.clone(),
                    source,
                }
            })?;

        tracing::debug!(collection = %self.spec.name, count = points.len(), "Upserted records");
        Ok(())
    }

    fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        filter: Option<&PayloadFilter>,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredRecord>> {
        if filter.is_some() {
            tracing::debug!(
                collection = %self.spec.name,
                "Payload filter is not applied to vector search"
            );
        }

        let request = SearchRequest {
            vector: query_vector.to_vec(),
            limit,
            with_payload: true,
            score_threshold,
        };

        let mut hits = self
            .api
            .search(&self.spec.name, &request)
            .map_err(|source| {
                tracing::error!(collection = %self.spec.name, error = %source, "Search failed");
                Error::Search {
                    collection: self.spec.name.clone(),
                    source,
                }
            })?;

        if let Some(threshold) = score_threshold {
            let distance = self.spec.distance;
            hits.retain(|hit| distance.meets_threshold(hit.score, threshold));
        }

        Ok(hits)
    }
}
