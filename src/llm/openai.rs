//! `OpenAI` client.

use super::chat::{ChatCompletions, ChatEngine};
use super::{GenerationOptions, LlmClient, build_json_messages, build_messages, describe_images};
use crate::Result;
use crate::transport::HttpConfig;
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// `OpenAI` (or compatible) hosted client.
///
/// A failed completion request is reported only after `failure_cooldown` has
/// elapsed, so that a caller looping over prompts backs off from a rate
/// limited endpoint. The request itself is never repeated.
pub struct OpenAiClient {
    engine: ChatEngine,
}

impl OpenAiClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";

    /// Default pause before a failed request is reported.
    pub const DEFAULT_FAILURE_COOLDOWN: Duration = Duration::from_secs(60);

    /// Creates a client for `model` at `base_url`.
    #[must_use]
    pub fn new(api_key: SecretString, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        let mut engine = ChatEngine::new("openai", api_key, model.into(), base_url.into());
        engine.failure_cooldown = Self::DEFAULT_FAILURE_COOLDOWN;
        Self { engine }
    }

    /// Sets the failure cooldown; zero disables it.
    #[must_use]
    pub const fn with_failure_cooldown(mut self, cooldown: Duration) -> Self {
        self.engine.failure_cooldown = cooldown;
        self
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

    /// Returns the failure cooldown.
    #[must_use]
    pub const fn failure_cooldown(&self) -> Duration {
        self.engine.failure_cooldown
    }
}

impl LlmClient for OpenAiClient {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SecretString {
        SecretString::from("sk-test".to_string())
    }

    #[test]
    fn test_client_defaults() {
        let client = OpenAiClient::new(key(), "gpt-4o-mini", OpenAiClient::DEFAULT_ENDPOINT);
        assert_eq!(client.name(), "openai");
        assert_eq!(client.model(), "gpt-4o-mini");
        assert_eq!(client.endpoint(), "https://api.openai.com/v1");
        assert_eq!(client.failure_cooldown(), Duration::from_secs(60));
    }

    #[test]
    fn test_cooldown_configurable() {
        let client = OpenAiClient::new(key(), "gpt-4o", "http://proxy/v1")
            .with_failure_cooldown(Duration::ZERO)
            .with_http_config(HttpConfig {
                timeout_ms: 1_000,
                ..HttpConfig::default()
            });
        assert_eq!(client.failure_cooldown(), Duration::ZERO);
        assert_eq!(client.endpoint(), "http://proxy/v1");
    }
}
