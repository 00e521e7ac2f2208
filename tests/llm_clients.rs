//! LLM client tests.
//!
//! Drives both client variants through a recording `ChatCompletions` fake:
//! - Message construction for text, JSON and image prompts
//! - Structured output validation
//! - Error classification (request, parse, schema)
//! - Failure cooldown on the hosted client, and no retries on either
//!
//! No network access or API keys are needed.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use conduit::Error;
use conduit::cli::{LlmArgs, LlmCommand};
use conduit::llm::{
    ChatCompletionRequest, ChatCompletionResponse, ChatCompletions, ContentPart,
    GenerationOptions, LlmClient, LocalOpenAiClient, MessageContent, OpenAiClient, Role,
};
use conduit::transport::TransportError;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Records every request and answers from a fixed script.
struct RecordingChat {
    reply: Reply,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

enum Reply {
    Content(&'static str),
    NoChoices,
    Fail,
}

impl RecordingChat {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ChatCompletions for RecordingChat {
    fn create(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.reply {
            Reply::Content(text) => Ok(ChatCompletionResponse::with_content(text)),
            Reply::NoChoices => Ok(ChatCompletionResponse::default()),
            Reply::Fail => Err(TransportError::Status {
                status: 429,
                body: "rate limit exceeded".to_string(),
            }),
        }
    }
}

fn key() -> SecretString {
    SecretString::from("sk-test".to_string())
}

fn openai(chat: &Arc<RecordingChat>) -> OpenAiClient {
    OpenAiClient::new(key(), "gpt-4o-mini", OpenAiClient::DEFAULT_ENDPOINT)
        .with_failure_cooldown(Duration::ZERO)
        .with_transport(chat.clone())
}

fn local(chat: &Arc<RecordingChat>) -> LocalOpenAiClient {
    LocalOpenAiClient::with_default_endpoint(key(), "qwen2.5-vl").with_transport(chat.clone())
}

// ============================================================================
// generate
// ============================================================================

#[test]
fn test_generate_with_system_prompt_sends_two_messages() {
    let chat = RecordingChat::new(Reply::Content("hi"));
    let client = openai(&chat);

    let options = GenerationOptions::default()
        .with_max_tokens(10)
        .with_system_prompt("be terse");
    let text = client.generate("hello", &options).unwrap();
    assert_eq!(text, "hi");

    let requests = chat.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.model, "gpt-4o-mini");
    assert_eq!(request.max_tokens, Some(10));
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(
        request.messages[0].content,
        MessageContent::Text("be terse".to_string())
    );
    assert_eq!(request.messages[1].role, Role::User);
    assert_eq!(
        request.messages[1].content,
        MessageContent::Parts(vec![ContentPart::Text {
            text: "hello".to_string()
        }])
    );
}

#[test]
fn test_generate_without_system_prompt_sends_one_message() {
    let chat = RecordingChat::new(Reply::Content("ok"));
    local(&chat)
        .generate("hello", &GenerationOptions::default())
        .unwrap();

    let request = &chat.requests()[0];
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.model, "qwen2.5-vl");
    assert!(request.temperature.abs() < f32::EPSILON);
}

#[test]
fn test_extra_parameters_reach_request_body() {
    let chat = RecordingChat::new(Reply::Content("ok"));
    let options = GenerationOptions::default()
        .with_extra("top_p", json!(0.9))
        .with_extra("stop", json!(["\n\n"]));
    openai(&chat).generate("hello", &options).unwrap();

    let body = serde_json::to_value(&chat.requests()[0]).unwrap();
    assert_eq!(body["top_p"], json!(0.9));
    assert_eq!(body["stop"], json!(["\n\n"]));
}

#[test]
fn test_generate_without_choices_is_parse_error() {
    let chat = RecordingChat::new(Reply::NoChoices);
    let err = local(&chat)
        .generate("hello", &GenerationOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            provider: "local",
            operation: "generate",
            ..
        }
    ));
}

// ============================================================================
// generate_json
// ============================================================================

#[derive(Debug, Deserialize, PartialEq)]
struct Answer {
    a: i64,
}

#[test]
fn test_generate_json_accepts_valid_object() {
    let chat = RecordingChat::new(Reply::Content(r#"{"a": 1}"#));
    let answer: Answer = openai(&chat)
        .generate_json("give me a", &GenerationOptions::default())
        .unwrap();
    assert_eq!(answer, Answer { a: 1 });

    let request = &chat.requests()[0];
    assert_eq!(
        request.messages[0].content,
        MessageContent::Text("give me a".to_string())
    );
}

#[test]
fn test_generate_json_rejects_prose() {
    let chat = RecordingChat::new(Reply::Content("not json"));
    let result: conduit::Result<Answer> =
        local(&chat).generate_json("give me a", &GenerationOptions::default());
    assert!(matches!(result, Err(Error::Schema { .. })));
}

#[test]
fn test_generate_json_rejects_wrong_shape() {
    let chat = RecordingChat::new(Reply::Content(r#"{"b": "x"}"#));
    let result: conduit::Result<Answer> =
        openai(&chat).generate_json("give me a", &GenerationOptions::default());
    assert!(matches!(result, Err(Error::Schema { .. })));
}

// ============================================================================
// generate_with_images
// ============================================================================

fn image_file(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    file.write_all(bytes).unwrap();
    file
}

#[test]
fn test_generate_with_images_builds_parts_in_order() {
    let first = image_file(b"abc");
    let second = image_file(b"\xff\xd8\xff");
    let chat = RecordingChat::new(Reply::Content("  A cat on a mat.\n"));

    let text = local(&chat)
        .generate_with_images(
            "Describe",
            &[first.path().to_path_buf(), second.path().to_path_buf()],
            &GenerationOptions::for_images(),
        )
        .unwrap();
    assert_eq!(text, "A cat on a mat.");

    let request = &chat.requests()[0];
    assert_eq!(request.max_tokens, Some(512));
    assert!((request.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(request.messages.len(), 1);

    let MessageContent::Parts(parts) = &request.messages[0].content else {
        panic!("image prompt must be multi-part");
    };
    assert_eq!(parts.len(), 3);
    assert_eq!(
        parts[0],
        ContentPart::Text {
            text: "Describe".to_string()
        }
    );
    let urls: Vec<&str> = parts[1..]
        .iter()
        .map(|part| match part {
            ContentPart::ImageUrl { image_url } => image_url.url.as_str(),
            ContentPart::Text { .. } => panic!("expected image part"),
        })
        .collect();
    assert_eq!(
        urls,
        vec!["data:image/jpeg;base64,YWJj", "data:image/jpeg;base64,/9j/"]
    );
}

#[test]
fn test_unreadable_image_is_request_error_without_call() {
    let chat = RecordingChat::new(Reply::Content("unused"));
    let err = openai(&chat)
        .generate_with_images(
            "Describe",
            &[PathBuf::from("/nonexistent/photo.jpg")],
            &GenerationOptions::for_images(),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Request {
            operation: "generate_with_images",
            source: TransportError::Io { .. },
            ..
        }
    ));
    assert!(chat.requests().is_empty());
}

// ============================================================================
// Failures and cooldown
// ============================================================================

#[test]
fn test_request_failure_is_request_error_for_both_variants() {
    let chat = RecordingChat::new(Reply::Fail);

    let err = openai(&chat)
        .generate("hello", &GenerationOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Request { provider: "openai", .. }));

    let err = local(&chat)
        .generate("hello", &GenerationOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Request { provider: "local", .. }));
    assert_eq!(err.to_string(), "local generate request failed");
}

#[test]
fn test_openai_cooldown_delays_failure_without_retry() {
    let chat = RecordingChat::new(Reply::Fail);
    let client = openai(&chat).with_failure_cooldown(Duration::from_millis(50));

    let started = Instant::now();
    let result = client.generate("hello", &GenerationOptions::default());

    assert!(matches!(result, Err(Error::Request { .. })));
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(chat.requests().len(), 1);
}

#[test]
fn test_success_skips_cooldown() {
    let chat = RecordingChat::new(Reply::Content("fast"));
    let client = openai(&chat).with_failure_cooldown(Duration::from_secs(60));

    let started = Instant::now();
    client.generate("hello", &GenerationOptions::default()).unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
}

// ============================================================================
// CLI
// ============================================================================

#[test]
fn test_llm_command_json_prints_value() {
    let chat = RecordingChat::new(Reply::Content(r#"{"a": 1}"#));
    let client = local(&chat);
    let args = LlmArgs {
        local: true,
        model: None,
        max_tokens: Some(64),
        temperature: None,
        system: Some("answer in JSON".to_string()),
        command: LlmCommand::Json {
            prompt: "give me a".to_string(),
        },
    };

    let mut out = Vec::new();
    args.execute(&client, &mut out).unwrap();

    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value, json!({"a": 1}));
    let request = &chat.requests()[0];
    assert_eq!(request.max_tokens, Some(64));
    assert_eq!(request.messages.len(), 2);
}

#[test]
fn test_llm_command_json_rejects_prose() {
    let chat = RecordingChat::new(Reply::Content("Sure! Here you go."));
    let client = openai(&chat);
    let args = LlmArgs {
        local: false,
        model: None,
        max_tokens: None,
        temperature: None,
        system: None,
        command: LlmCommand::Json {
            prompt: "give me a".to_string(),
        },
    };

    let err = args.execute(&client, &mut Vec::new()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::Schema { .. })
    ));
}
