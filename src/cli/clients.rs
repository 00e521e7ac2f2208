//! Client factory functions for CLI commands.
//!
//! Builds adapters and LLM clients from [`ConduitConfig`].

use crate::config::{ConduitConfig, LlmSettings};
use crate::document::{ArangoCollection, CollectionSpec};
use crate::llm::{LlmClient, LocalOpenAiClient, OpenAiClient};
use crate::transport::HttpConfig;
use crate::vector::{QdrantCollection, VectorCollectionSpec};
use crate::Result;
use secrecy::SecretString;

/// Placeholder key for local servers that ignore authentication.
pub const LOCAL_PLACEHOLDER_KEY: &str = "EMPTY";

/// Connects to the configured document store and opens `spec`.
///
/// # Errors
///
/// Returns an error if the server is unreachable or the collection cannot
/// be created.
pub fn build_document_collection(
    config: &ConduitConfig,
    spec: CollectionSpec,
) -> Result<ArangoCollection> {
    ArangoCollection::connect(&config.document, spec)
}

/// Builds an adapter for `spec` on the configured vector store.
#[must_use]
pub fn build_vector_collection(
    config: &ConduitConfig,
    spec: VectorCollectionSpec,
) -> QdrantCollection {
    QdrantCollection::new(&config.vector, spec)
}

/// Builds an `OpenAI` client from configuration.
#[must_use]
pub fn build_openai_client(settings: &LlmSettings, http: HttpConfig) -> OpenAiClient {
    OpenAiClient::new(api_key(settings), &settings.model, &settings.base_url)
        .with_failure_cooldown(settings.failure_cooldown)
        .with_http_config(http)
}

/// Builds a local client from configuration.
#[must_use]
pub fn build_local_client(settings: &LlmSettings, http: HttpConfig) -> LocalOpenAiClient {
    LocalOpenAiClient::new(api_key(settings), &settings.model, &settings.local_base_url)
        .with_http_config(http)
}

/// Builds the client selected on the command line.
#[must_use]
pub fn build_llm_client(settings: &LlmSettings, http: HttpConfig, local: bool) -> Box<dyn LlmClient> {
    if local {
        Box::new(build_local_client(settings, http))
    } else {
        if settings.api_key.is_none() {
            tracing::warn!("No API key configured for the hosted LLM client");
        }
        Box::new(build_openai_client(settings, http))
    }
}

fn api_key(settings: &LlmSettings) -> SecretString {
    settings
        .api_key
        .clone()
        .unwrap_or_else(|| SecretString::from(LOCAL_PLACEHOLDER_KEY.to_string()))
}
