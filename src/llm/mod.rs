//! LLM client abstraction.
//!
//! Two clients share one contract, [`LlmClient`], over any OpenAI-compatible
//! Chat Completions endpoint:
//!
//! | Client | Default Endpoint | On Request Failure |
//! |--------|------------------|--------------------|
//! | [`OpenAiClient`] | `https://api.openai.com/v1` | Sleeps `failure_cooldown`, then fails |
//! | [`LocalOpenAiClient`] | `http://localhost:8000/v1` | Fails immediately |
//!
//! Neither client retries.

mod chat;
mod image;
mod local;
mod openai;

pub use chat::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatCompletions, ChatMessage,
    ContentPart, HttpChatCompletions, ImageUrl, MessageContent, ResponseMessage, Role,
};
pub use image::{IMAGE_MIME_TYPE, encode_image_data_uri};
pub use local::LocalOpenAiClient;
pub use openai::OpenAiClient;

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;

/// Sampling options for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Optional system instructions, sent as a separate message first.
    pub system_prompt: Option<String>,
    /// Extra request parameters (e.g. `top_p`, `stop`).
    pub extra: serde_json::Map<String, Value>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            system_prompt: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl GenerationOptions {
    /// Default token limit.
    pub const DEFAULT_MAX_TOKENS: u32 = 512;

    /// Default temperature for image prompts.
    pub const DEFAULT_IMAGE_TEMPERATURE: f32 = 0.7;

    /// Defaults for [`LlmClient::generate_with_images`].
    #[must_use]
    pub fn for_images() -> Self {
        Self {
            temperature: Self::DEFAULT_IMAGE_TEMPERATURE,
            ..Self::default()
        }
    }

    /// Sets the token limit.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Adds an extra request parameter.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Shared contract of the chat completion clients.
pub trait LlmClient: Send + Sync {
    /// The client variant name.
    fn name(&self) -> &'static str;

    /// The model requested on every call.
    fn model(&self) -> &str;

    /// Generates text for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if the call fails, or [`Error::Parse`] if
    /// the response has no content.
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Generates raw text expected to be a JSON document.
    ///
    /// The prompt is sent as plain-text content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if the call fails, or [`Error::Parse`] if
    /// the response has no content.
    fn generate_json_text(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Generates structured output decoded into `T`.
    ///
    /// # Errors
    ///
    /// As [`generate_json_text`](Self::generate_json_text), plus
    /// [`Error::Schema`] if the output is not valid JSON for `T`.
    fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<T>
    where
        Self: Sized,
    {
        let text = self.generate_json_text(prompt, options)?;
        decode_structured(&text)
    }

    /// Describes one or more images. The result is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if an image cannot be read or the call
    /// fails, or [`Error::Parse`] if the response has no content.
    fn generate_with_images(
        &self,
        prompt: &str,
        images: &[PathBuf],
        options: &GenerationOptions,
    ) -> Result<String>;
}

/// Decodes model output into `T`.
///
/// # Errors
///
/// Returns [`Error::Schema`] if `text` is not valid JSON for `T`.
pub fn decode_structured<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text.trim()).map_err(|source| {
        tracing::error!(error = %source, "Model output failed JSON validation");
        Error::Schema { source }
    })
}

/// Builds messages for a text prompt: the optional system message, then one
/// user message carrying a single text part.
#[must_use]
pub fn build_messages(prompt: &str, system_prompt: Option<&str>) -> Vec<ChatMessage> {
    with_system(
        system_prompt,
        ChatMessage::user_parts(vec![ContentPart::Text {
            text: prompt.to_string(),
        }]),
    )
}

/// Builds messages for a structured-output prompt; the user content is plain text.
#[must_use]
pub fn build_json_messages(prompt: &str, system_prompt: Option<&str>) -> Vec<ChatMessage> {
    with_system(system_prompt, ChatMessage::user_text(prompt))
}

/// Builds messages for an image prompt: the text part followed by one
/// `image_url` part per data URI, in order, in a single user message.
#[must_use]
pub fn build_image_messages(
    prompt: &str,
    image_uris: Vec<String>,
    system_prompt: Option<&str>,
) -> Vec<ChatMessage> {
    let mut parts = Vec::with_capacity(image_uris.len() + 1);
    parts.push(ContentPart::Text {
        text: prompt.to_string(),
    });
    parts.extend(image_uris.into_iter().map(|url| ContentPart::ImageUrl {
        image_url: ImageUrl { url },
    }));
    with_system(system_prompt, ChatMessage::user_parts(parts))
}

fn with_system(system_prompt: Option<&str>, user: ChatMessage) -> Vec<ChatMessage> {
    match system_prompt {
        Some(system) => vec![ChatMessage::system(system), user],
        None => vec![user],
    }
}

/// Shared body of `generate_with_images` for both clients.
fn describe_images(
    engine: &chat::ChatEngine,
    prompt: &str,
    images: &[PathBuf],
    options: &GenerationOptions,
) -> Result<String> {
    const OPERATION: &str = "generate_with_images";

    let uris = images
        .iter()
        .map(|path| {
            encode_image_data_uri(path).map_err(|source| {
                tracing::error!(
                    provider = engine.provider,
                    path = %path.display(),
                    error = %source,
                    "Failed to read image"
                );
                engine.request_error(OPERATION, source)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let messages = build_image_messages(prompt, uris, options.system_prompt.as_deref());
    engine
        .complete(OPERATION, messages, options)
        .map(|text| text.trim().to_string())
}
