//! Client for locally served OpenAI-compatible models (vLLM, LM Studio, llama.cpp).

use super::chat::{ChatCompletions, ChatEngine};
use super::{GenerationOptions, LlmClient, build_json_messages, build_messages, describe_images};
use crate::Result;
use crate::transport::HttpConfig;
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;

/// Local OpenAI-compatible client. Errors are returned immediately.
pub struct LocalOpenAiClient {
    engine: ChatEngine,
}

impl LocalOpenAiClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:8000/v1";

    /// Creates a client for `model` at `base_url`.
    #[must_use]
    pub fn new(api_key: SecretString, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            engine: ChatEngine::new("local", api_key, model.into(), base_url.into()),
        }
    }

    /// Creates a client for `model` at [`DEFAULT_ENDPOINT`](Self::DEFAULT_ENDPOINT).
    #[must_use]
    pub fn with_default_endpoint(api_key: SecretString, model: impl Into<String>) -> Self {
        Self::new(api_key, model, Self::DEFAULT_ENDPOINT)
    }

    /// Rebuilds the HTTP client with `http` timeouts.
    #[must_use]
    pub fn with_http_config(mut self, http: HttpConfig) -> Self {
        self.engine.set_http_config(http);
        self
    }

    /// Replaces the underlying chat completion client.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn ChatCompletions>) -> Self {
        self.engine.set_transport(transport);
        self
    }

    /// Returns the API endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.engine.endpoint
    }
}

impl LlmClient for LocalOpenAiClient {
    fn name(&self) -> &'static str {
        self.engine.provider
    }

    fn model(&self) -> &str {
        &self.engine.model
    }

    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let messages = build_messages(prompt, options.system_prompt.as_deref());
        self.engine.complete("generate", messages, options)
    }

    fn generate_json_text(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let messages = build_json_messages(prompt, options.system_prompt.as_deref());
        self.engine.complete("generate_json", messages, options)
    }

    fn generate_with_images(
        &self,
        prompt: &str,
        images: &[PathBuf],
        options: &GenerationOptions,
    ) -> Result<String> {
        describe_images(&self.engine, prompt, images, options)
    }
}
