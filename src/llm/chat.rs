//! Chat Completions wire types and the shared request path.

use crate::transport::{self, HttpConfig, TransportError};
use crate::{Error, Result};
use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// End-user input.
    User,
}

/// Content of a chat message: plain text or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// Typed parts (text and images).
    Parts(Vec<ContentPart>),
}

/// One typed part of a multi-part message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A text part.
    Text {
        /// The text.
        text: String,
    },
    /// An image reference.
    ImageUrl {
        /// The image location.
        image_url: ImageUrl,
    },
}

/// Image location; a `data:` URI for inlined images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// URL or data URI.
    pub url: String,
}

/// A message in the chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: Role,
    /// Content.
    pub content: MessageContent,
}

impl ChatMessage {
    /// A plain-text system message.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A plain-text user message.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A multi-part user message.
    #[must_use]
    pub const fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Request to the Chat Completions API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    /// Model name.
    pub model: String,
    /// Conversation.
    pub messages: Vec<ChatMessage>,
    /// Token limit for the completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Additional provider parameters (e.g. `top_p`, `stop`), sent as top-level fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Response from the Chat Completions API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionResponse {
    /// Generated choices.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// A choice in the response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// The generated message.
    pub message: ResponseMessage,
}

/// Message of a response choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    /// Generated text; absent for e.g. tool-call-only responses.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Builds a response with a single choice carrying `content`.
    #[must_use]
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: ResponseMessage {
                    content: Some(content.into()),
                },
            }],
        }
    }
}

/// The underlying chat completion client.
pub trait ChatCompletions: Send + Sync {
    /// Sends one chat completion request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    fn create(
        &self,
        request: &ChatCompletionRequest,
    ) -> std::result::Result<ChatCompletionResponse, TransportError>;
}

/// `POST {endpoint}/chat/completions` over blocking HTTP.
pub struct HttpChatCompletions {
    endpoint: String,
    api_key: SecretString,
    client: Client,
}

impl HttpChatCompletions {
    /// Creates a client for an OpenAI-compatible endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: SecretString, http: HttpConfig) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            client: transport::build_http_client(http),
        }
    }

    /// Returns the API endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChatCompletions for HttpChatCompletions {
    fn create(
        &self,
        request: &ChatCompletionRequest,
    ) -> std::result::Result<ChatCompletionResponse, TransportError> {
        transport::send_json(
            self.client
                .post(format!("{}/chat/completions", self.endpoint))
                .bearer_auth(self.api_key.expose_secret())
                .json(request),
        )
    }
}

/// Request path shared by both client variants.
pub(crate) struct ChatEngine {
    pub(crate) provider: &'static str,
    pub(crate) model: String,
    pub(crate) endpoint: String,
    api_key: SecretString,
    transport: Arc<dyn ChatCompletions>,
    /// Pause before a failed request is reported; zero disables.
    pub(crate) failure_cooldown: Duration,
}

impl ChatEngine {
    pub(crate) fn new(
        provider: &'static str,
        api_key: SecretString,
        model: String,
        endpoint: String,
    ) -> Self {
        let transport = Arc::new(HttpChatCompletions::new(
            endpoint.clone(),
            api_key.clone(),
            HttpConfig::default(),
        ));
        Self {
            provider,
            model,
            endpoint,
            api_key,
            transport,
            failure_cooldown: Duration::ZERO,
        }
    }

    pub(crate) fn set_http_config(&mut self, http: HttpConfig) {
        self.transport = Arc::new(HttpChatCompletions::new(
            self.endpoint.clone(),
            self.api_key.clone(),
            http,
        ));
    }

    pub(crate) fn set_transport(&mut self, transport: Arc<dyn ChatCompletions>) {
        self.transport = transport;
    }

    /// Sends `messages` and returns the first choice's content.
    pub(crate) fn complete(
        &self,
        operation: &'static str,
        messages: Vec<ChatMessage>,
        options: &super::GenerationOptions,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(options.max_tokens),
            temperature: options.temperature,
            extra: options.extra.clone(),
        };

        tracing::debug!(
            provider = self.provider,
            model = %self.model,
            operation,
            messages = request.messages.len(),
            "Making LLM request"
        );

        let response = self.transport.create(&request).map_err(|source| {
            tracing::error!(
                provider = self.provider,
                model = %self.model,
                operation,
                error = %source,
                "LLM request failed"
            );
            self.cool_down();
            self.request_error(operation, source)
        })?;

        first_content(response).map_err(|reason| {
            tracing::error!(
                provider = self.provider,
                model = %self.model,
                operation,
                reason = %reason,
                "Failed to parse LLM response"
            );
            Error::Parse {
                provider: self.provider,
                operation,
                reason,
            }
        })
    }

    pub(crate) const fn request_error(&self, operation: &'static str, source: TransportError) -> Error {
        Error::Request {
            provider: self.provider,
            operation,
            source,
        }
    }

    fn cool_down(&self) {
        if self.failure_cooldown.is_zero() {
            return;
        }
        tracing::warn!(
            provider = self.provider,
            cooldown_ms = u64::try_from(self.failure_cooldown.as_millis()).unwrap_or(u64::MAX),
            "Cooling down before reporting LLM failure"
        );
        std::thread::sleep(self.failure_cooldown);
    }
}

/// Extracts the first choice's content.
fn first_content(response: ChatCompletionResponse) -> std::result::Result<String, String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| "No choices in response".to_string())?;
    choice
        .message
        .content
        .ok_or_else(|| "No content in first choice".to_string())
}
