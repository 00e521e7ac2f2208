//! Configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` at an explicit path, or in the platform config dir
//!    (`~/.config/conduit/` on Linux)
//! 3. Environment variables (`CONDUIT_*`, plus `OPENAI_API_KEY`)
//!
//! ```toml
//! [document]
//! host = "http://localhost"
//! database = "pipeline"
//!
//! [vector]
//! port = 6333
//!
//! [llm]
//! model = "gpt-4o-mini"
//! failure_cooldown_secs = 60
//!
//! [logging]
//! format = "json"
//! ```

use crate::document::ArangoConfig;
use crate::llm::{LocalOpenAiClient, OpenAiClient};
use crate::transport::HttpConfig;
use crate::vector::QdrantConfig;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for conduit.
#[derive(Debug, Clone)]
pub struct ConduitConfig {
    /// Document store connection.
    pub document: ArangoConfig,
    /// Vector store connection.
    pub vector: QdrantConfig,
    /// LLM client settings.
    pub llm: LlmSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// HTTP timeouts shared by every client.
    pub http: HttpConfig,
}

impl Default for ConduitConfig {
    fn default() -> Self {
        Self {
            document: ArangoConfig::new("http://localhost"),
            vector: QdrantConfig::default(),
            llm: LlmSettings::default(),
            logging: LoggingSettings::default(),
            http: HttpConfig::default(),
        }
    }
}

/// LLM client settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// API key; local servers usually accept any value.
    pub api_key: Option<SecretString>,
    /// Model name.
    pub model: String,
    /// Endpoint of the hosted client.
    pub base_url: String,
    /// Endpoint of the local client.
    pub local_base_url: String,
    /// Pause before the hosted client reports a failed request.
    pub failure_cooldown: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: OpenAiClient::DEFAULT_ENDPOINT.to_string(),
            local_base_url: LocalOpenAiClient::DEFAULT_ENDPOINT.to_string(),
            failure_cooldown: OpenAiClient::DEFAULT_FAILURE_COOLDOWN,
        }
    }
}

impl LlmSettings {
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
}

/// Logging settings. Environment overrides are applied by
/// [`LoggingConfig::from_settings`](crate::observability::LoggingConfig::from_settings).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `conduit=debug`.
    pub filter: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Append log output to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Document store section.
    pub document: Option<ConfigFileDocument>,
    /// Vector store section.
    pub vector: Option<ConfigFileVector>,
    /// LLM section.
    pub llm: Option<ConfigFileLlm>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// HTTP section.
    pub http: Option<ConfigFileHttp>,
}

/// Document store section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileDocument {
    /// Host, including scheme.
    pub host: Option<String>,
    /// Port.
    pub port: Option<u16>,
    /// Username.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Database.
    pub database: Option<String>,
}

/// Vector store section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileVector {
    /// Host.
    pub host: Option<String>,
    /// Port.
    pub port: Option<u16>,
    /// API key.
    pub api_key: Option<String>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLlm {
    /// API key.
    pub api_key: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Hosted endpoint.
    pub base_url: Option<String>,
    /// Local endpoint.
    pub local_base_url: Option<String>,
    /// Failure cooldown in seconds.
    pub failure_cooldown_secs: Option<u64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLogging {
    /// Filter directive.
    pub filter: Option<String>,
    /// Output format.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<PathBuf>,
}

/// HTTP section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileHttp {
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

impl ConduitConfig {
    /// Loads configuration from `path`, or from the default location when
    /// `path` is `None`, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, or if any file that
    /// is found cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(found) => Self::load_from_file(&found)?,
                None => Self::default(),
            },
        };
        Ok(config.with_env_overrides())
    }

    /// Path of the default config file, if a home directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("conduit").join("config.toml"))
    }

    /// Loads configuration from a file path, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self::from_config_file(file))
    }

    /// Converts a `ConfigFile` to `ConduitConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(document) = file.document {
            let target = &mut config.document;
            if let Some(host) = document.host {
                target.host = host;
            }
            if let Some(port) = document.port {
                target.port = port;
            }
            if let Some(username) = document.username {
                target.username = username;
            }
            if let Some(password) = document.password {
                target.password = SecretString::from(password);
            }
            if let Some(database) = document.database {
                target.database = database;
            }
        }
        if let Some(vector) = file.vector {
            if let Some(host) = vector.host {
                config.vector.host = host;
            }
            if let Some(port) = vector.port {
                config.vector.port = port;
            }
            config.vector.api_key = vector.api_key.map(SecretString::from);
        }
        if let Some(llm) = file.llm {
            config.llm.api_key = llm.api_key.map(SecretString::from);
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(base_url) = llm.base_url {
                config.llm.base_url = base_url;
            }
            if let Some(local_base_url) = llm.local_base_url {
                config.llm.local_base_url = local_base_url;
            }
            if let Some(secs) = llm.failure_cooldown_secs {
                config.llm.failure_cooldown = Duration::from_secs(secs);
            }
        }
        if let Some(logging) = file.logging {
            config.logging = LoggingSettings {
                filter: logging.filter,
                format: logging.format,
                file: logging.file,
            };
        }
        if let Some(http) = file.http {
            if let Some(timeout_ms) = http.timeout_ms {
                config.http.timeout_ms = timeout_ms;
            }
            if let Some(connect_timeout_ms) = http.connect_timeout_ms {
                config.http.connect_timeout_ms = connect_timeout_ms;
            }
        }

        config.sync_http();
        config
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    ///
    /// Empty values are ignored, as are ports and durations that do not parse.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let number = |name: &str| var(name).and_then(|v| v.trim().parse::<u64>().ok());
        let port = |name: &str| var(name).and_then(|v| v.trim().parse::<u16>().ok());

        if let Some(host) = var("CONDUIT_ARANGO_HOST") {
            self.document.host = host;
        }
        if let Some(p) = port("CONDUIT_ARANGO_PORT") {
            self.document.port = p;
        }
        if let Some(username) = var("CONDUIT_ARANGO_USERNAME") {
            self.document.username = username;
        }
        if let Some(password) = var("CONDUIT_ARANGO_PASSWORD") {
            self.document.password = SecretString::from(password);
        }
        if let Some(database) = var("CONDUIT_ARANGO_DATABASE") {
            self.document.database = database;
        }

        if let Some(host) = var("CONDUIT_QDRANT_HOST") {
            self.vector.host = host;
        }
        if let Some(p) = port("CONDUIT_QDRANT_PORT") {
            self.vector.port = p;
        }
        if let Some(key) = var("CONDUIT_QDRANT_API_KEY") {
            self.vector.api_key = Some(SecretString::from(key));
        }

        if let Some(key) = var("CONDUIT_LLM_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            self.llm.api_key = Some(SecretString::from(key));
        }
        if let Some(model) = var("CONDUIT_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = var("CONDUIT_LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(local_base_url) = var("CONDUIT_LLM_LOCAL_BASE_URL") {
            self.llm.local_base_url = local_base_url;
        }
        if let Some(secs) = number("CONDUIT_LLM_FAILURE_COOLDOWN_SECS") {
            self.llm.failure_cooldown = Duration::from_secs(secs);
        }

        if let Some(file) = var("CONDUIT_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }

        self.http = self.http.with_overrides(&lookup);
        self.sync_http();
        self
    }

    fn sync_http(&mut self) {
        self.document.http = self.http;
        self.vector.http = self.http;
    }

    /// Effective settings as JSON, with secrets masked.
    #[must_use]
    pub fn redacted(&self) -> Value {
        json!({
            "document": {
                "host": self.document.host,
                "port": self.document.port,
                "username": self.document.username,
                "password": mask(Some(&self.document.password)),
                "database": self.document.database,
            },
            "vector": {
                "host": self.vector.host,
                "port": self.vector.port,
                "api_key": mask(self.vector.api_key.as_ref()),
            },
            "llm": {
                "api_key": mask(self.llm.api_key.as_ref()),
                "model": self.llm.model,
                "base_url": self.llm.base_url,
                "local_base_url": self.llm.local_base_url,
                "failure_cooldown_secs": self.llm.failure_cooldown.as_secs(),
            },
            "logging": {
                "filter": self.logging.filter,
                "format": self.logging.format,
                "file": self.logging.file.as_ref().map(|p| p.display().to_string()),
            },
            "http": {
                "timeout_ms": self.http.timeout_ms,
                "connect_timeout_ms": self.http.connect_timeout_ms,
            },
        })
    }
}

/// `null` when unset or empty, `"***"` otherwise.
fn mask(secret: Option<&SecretString>) -> Value {
    match secret {
        Some(s) if !s.expose_secret().is_empty() => Value::String("***".to_string()),
        _ => Value::Null,
    }
}
