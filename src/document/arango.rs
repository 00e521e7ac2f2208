//! ArangoDB HTTP client.
//!
//! # Endpoints Used
//!
//! | Operation | Request |
//! |-----------|---------|
//! | Connect | `GET /_db/{db}/_api/version` |
//! | Has collection | `GET /_db/{db}/_api/collection/{name}` |
//! | Create collection | `POST /_db/{db}/_api/collection` |
//! | Insert | `POST /_db/{db}/_api/document/{collection}` |
//! | Get | `GET /_db/{db}/_api/document/{collection}/{key}` |
//! | Delete | `DELETE /_db/{db}/_api/document/{collection}/{key}` |
//! | Update, list, query | `POST /_db/{db}/_api/cursor` then `PUT /_db/{db}/_api/cursor/{id}` |

use super::{CollectionKind, Document, DocumentApi, InsertResult};
use crate::transport::{self, HttpConfig, TransportError};
use crate::{Error, Result};
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const UPDATE_BY_KEY_AQL: &str =
    "FOR doc IN @@collection FILTER doc._key == @key UPDATE doc WITH @updates IN @@collection RETURN 1";
const PAGE_AQL: &str = "FOR doc IN @@collection LIMIT @skip, @limit RETURN doc";

/// `errorNum` ArangoDB reports for a missing document. A missing collection
/// also answers 404, with 1203.
const ERROR_DOCUMENT_NOT_FOUND: u32 = 1202;

/// Returns true only when the server says the document itself does not exist.
fn is_document_not_found(err: &TransportError) -> bool {
    match err {
        TransportError::Status { status: 404, body } => serde_json::from_str::<ErrorBody>(body)
            .is_ok_and(|body| body.error_num == Some(ERROR_DOCUMENT_NOT_FOUND)),
        _ => false,
    }
}

/// Connection settings for an ArangoDB server.
#[derive(Debug, Clone)]
pub struct ArangoConfig {
    /// Host name or address, including the scheme (e.g. `http://localhost`).
    pub host: String,
    /// Port the server listens on.
    pub port: u16,
    /// Username for basic authentication.
    pub username: String,
    /// Password for basic authentication.
    pub password: SecretString,
    /// Database name.
    pub database: String,
    /// HTTP timeouts.
    pub http: HttpConfig,
}

impl ArangoConfig {
    /// Default ArangoDB port.
    pub const DEFAULT_PORT: u16 = 8529;

    /// Default username.
    pub const DEFAULT_USERNAME: &'static str = "root";

    /// Default database.
    pub const DEFAULT_DATABASE: &'static str = "_system";

    /// Creates a configuration for `host` with default port, credentials and database.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            username: Self::DEFAULT_USERNAME.to_string(),
            password: SecretString::from(String::new()),
            database: Self::DEFAULT_DATABASE.to_string(),
            http: HttpConfig::default(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = SecretString::from(password.into());
        self
    }

    /// Sets the database.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sets the HTTP configuration.
    #[must_use]
    pub const fn with_http_config(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// `host:port/database`, as used in log and error messages.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}/{}", transport::base_url(&self.host, self.port), self.database)
    }
}

/// Blocking ArangoDB client bound to one database.
pub struct ArangoHttpClient {
    /// `{scheme}://{host}:{port}/_db/{database}`.
    base: Url,
    /// Username for basic authentication.
    username: String,
    /// Password for basic authentication.
    password: SecretString,
    /// HTTP client.
    client: Client,
}

impl ArangoHttpClient {
    /// Opens a client and verifies the server answers for the configured database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the address is invalid, the server is
    /// unreachable, or it rejects the credentials.
    pub fn connect(config: &ArangoConfig) -> Result<Self> {
        let target = config.target();
        Self::new(config)
            .and_then(|client| {
                let version: VersionResponse = transport::send_json(
                    client.request(reqwest::Method::GET, &["_api", "version"])?,
                )?;
                tracing::debug!(
                    address = %target,
                    server = %version.server,
                    version = %version.version,
                    "Connected to ArangoDB"
                );
                Ok(client)
            })
            .map_err(|source| {
                tracing::error!(address = %target, error = %source, "ArangoDB connection failed");
                Error::Connection { target, source }
            })
    }

    /// Creates a client without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not form a valid URL.
    pub fn new(config: &ArangoConfig) -> std::result::Result<Self, TransportError> {
        let raw = format!(
            "{}/_db/{}",
            transport::base_url(&config.host, config.port),
            config.database
        );
        let base = Url::parse(&raw).map_err(|e| TransportError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            base,
            username: config.username.clone(),
            password: config.password.clone(),
            client: transport::build_http_client(config.http),
        })
    }

    /// Builds the URL for the given path segments below the database root.
    fn url(&self, segments: &[&str]) -> std::result::Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidUrl {
                url: self.base.to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        segments: &[&str],
    ) -> std::result::Result<RequestBuilder, TransportError> {
        let url = self.url(segments)?;
        Ok(self
            .client
            .request(method, url)
            .basic_auth(&self.username, Some(self.password.expose_secret())))
    }

    /// Runs a cursor request and follows `hasMore` until the result is complete.
    fn drain_cursor(
        &self,
        body: &CursorRequest<'_>,
    ) -> std::result::Result<Vec<Value>, TransportError> {
        let mut page: CursorResponse =
            transport::send_json(self.request(reqwest::Method::POST, &["_api", "cursor"])?.json(body))?;

        if let Some(count) = page.count {
            tracing::debug!(count, "AQL cursor opened");
        }

        let mut results = Vec::new();
        loop {
            results.append(&mut page.result);
            let Some(id) = page.id.take().filter(|_| page.has_more) else {
                break;
            };
            page = transport::send_json(
                self.request(reqwest::Method::PUT, &["_api", "cursor", &id])?,
            )?;
        }

        Ok(results)
    }
}

impl DocumentApi for ArangoHttpClient {
    fn has_collection(&self, name: &str) -> std::result::Result<bool, TransportError> {
        match transport::send(self.request(reqwest::Method::GET, &["_api", "collection", name])?) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn create_collection(
        &self,
        name: &str,
        kind: CollectionKind,
    ) -> std::result::Result<(), TransportError> {
        transport::send(
            self.request(reqwest::Method::POST, &["_api", "collection"])?
                .json(&json!({ "name": name, "type": kind.api_type() })),
        )?;
        Ok(())
    }

    fn insert(
        &self,
        collection: &str,
        document: &Document,
        return_new: bool,
    ) -> std::result::Result<InsertResult, TransportError> {
        transport::send_json(
            self.request(reqwest::Method::POST, &["_api", "document", collection])?
                .query(&[("returnNew", return_new)])
                .json(document),
        )
    }

    fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> std::result::Result<Option<Document>, TransportError> {
        match transport::send_json(
            self.request(reqwest::Method::GET, &["_api", "document", collection, key])?,
        ) {
            Ok(document) => Ok(Some(document)),
            Err(e) if is_document_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn update_match(
        &self,
        collection: &str,
        key: &str,
        updates: &Document,
    ) -> std::result::Result<u64, TransportError> {
        let bind_vars = json!({ "@collection": collection, "key": key, "updates": updates });
        let rows = self.drain_cursor(&CursorRequest {
            query: UPDATE_BY_KEY_AQL,
            bind_vars: &bind_vars,
            count: false,
        })?;
        Ok(u64::try_from(rows.len()).unwrap_or(u64::MAX))
    }

    fn delete(&self, collection: &str, key: &str) -> std::result::Result<bool, TransportError> {
        match transport::send(
            self.request(reqwest::Method::DELETE, &["_api", "document", collection, key])?,
        ) {
            Ok(_) => Ok(true),
            Err(e) if is_document_not_found(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn all(
        &self,
        collection: &str,
        limit: usize,
        skip: usize,
    ) -> std::result::Result<Vec<Document>, TransportError> {
        let bind_vars = json!({ "@collection": collection, "limit": limit, "skip": skip });
        self.drain_cursor(&CursorRequest {
            query: PAGE_AQL,
            bind_vars: &bind_vars,
            count: false,
        })?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(TransportError::Decode))
        .collect()
    }

    fn query(
        &self,
        query: &str,
        bind_vars: &Document,
        count: bool,
    ) -> std::result::Result<Vec<Value>, TransportError> {
        let bind_vars = Value::Object(bind_vars.clone());
        self.drain_cursor(&CursorRequest {
            query,
            bind_vars: &bind_vars,
            count,
        })
    }
}

/// Body of `POST /_api/cursor`.
#[derive(Debug, Serialize)]
struct CursorRequest<'a> {
    query: &'a str,
    #[serde(rename = "bindVars")]
    bind_vars: &'a Value,
    count: bool,
}

/// One batch of a cursor.
#[derive(Debug, Deserialize)]
struct CursorResponse {
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default, rename = "hasMore")]
    has_more: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    count: Option<u64>,
}

/// Error body ArangoDB sends with every failed request.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default, rename = "errorNum")]
    error_num: Option<u32>,
}

/// Response of `GET /_api/version`.
#[derive(Debug, Deserialize)]
struct VersionResponse {
    server: String,
    version: String,
}
