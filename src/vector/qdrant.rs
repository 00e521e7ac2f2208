//! Qdrant REST client.
//!
//! # Endpoints Used
//!
//! | Operation | Request |
//! |-----------|---------|
//! | List collections | `GET /collections` |
//! | Create collection | `PUT /collections/{name}` |
//! | Upsert | `PUT /collections/{name}/points?wait=true` |
//! | Search | `POST /collections/{name}/points/search` |
//!
//! Every response is wrapped in `{"result": ..., "status": ..., "time": ...}`;
//! only `result` is read.

use super::{Point, ScoredRecord, SearchRequest, VectorApi, VectorParams};
use crate::transport::{self, HttpConfig, TransportError};
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

/// Connection settings for a Qdrant server.
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// Host name or address; `http://` is assumed when no scheme is given.
    pub host: String,
    /// REST port.
    pub port: u16,
    /// Optional API key, sent as the `api-key` header.
    pub api_key: Option<SecretString>,
    /// HTTP timeouts.
    pub http: HttpConfig,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: Self::DEFAULT_PORT,
            api_key: None,
            http: HttpConfig::default(),
        }
    }
}

impl QdrantConfig {
    /// Default Qdrant REST port.
    pub const DEFAULT_PORT: u16 = 6333;

    /// Creates a configuration for `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Sets the HTTP configuration.
    #[must_use]
    pub const fn with_http_config(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Base URL of the REST API.
    #[must_use]
    pub fn endpoint(&self) -> String {
        transport::base_url(&self.host, self.port)
    }
}

/// Blocking Qdrant REST client.
pub struct QdrantHttpClient {
    endpoint: String,
    api_key: Option<SecretString>,
    client: Client,
}

impl QdrantHttpClient {
    /// Creates a client. No request is made until the first call.
    #[must_use]
    pub fn new(config: &QdrantConfig) -> Self {
        Self {
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
            client: transport::build_http_client(config.http),
        }
    }

    /// Returns the REST endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Builds the URL for the given path segments; each segment is escaped.
    fn url(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let invalid = |reason: String| TransportError::InvalidUrl {
            url: self.endpoint.clone(),
            reason,
        };
        let mut url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        segments: &[&str],
    ) -> Result<RequestBuilder, TransportError> {
        let builder = self.client.request(method, self.url(segments)?);
        Ok(match &self.api_key {
            Some(key) => builder.header("api-key", key.expose_secret()),
            None => builder,
        })
    }
}

impl VectorApi for QdrantHttpClient {
    fn collection_names(&self) -> Result<Vec<String>, TransportError> {
        let response: Envelope<CollectionsResult> =
            transport::send_json(self.request(reqwest::Method::GET, &["collections"])?)?;
        Ok(response
            .result
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    fn create_collection(&self, name: &str, params: VectorParams) -> Result<(), TransportError> {
        transport::send(
            self.request(reqwest::Method::PUT, &["collections", name])?
                .json(&json!({ "vectors": params })),
        )?;
        Ok(())
    }

    fn upsert(&self, collection: &str, points: &[Point]) -> Result<(), TransportError> {
        transport::send(
            self.request(reqwest::Method::PUT, &["collections", collection, "points"])?
                .query(&[("wait", true)])
                .json(&json!({ "points": points })),
        )?;
        Ok(())
    }

    fn search(
        &self,
        collection: &str,
        request: &SearchRequest,
    ) -> Result<Vec<ScoredRecord>, TransportError> {
        let response: Envelope<Vec<ScoredRecord>> = transport::send_json(
            self.request(
                reqwest::Method::POST,
                &["collections", collection, "points", "search"],
            )?
            .json(request),
        )?;
        Ok(response.result)
    }
}

/// Standard Qdrant response wrapper.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}
