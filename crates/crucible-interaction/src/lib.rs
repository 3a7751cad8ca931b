//! Chat collaborator boundary.
//!
//! Core logic never inspects raw provider payloads. Every backend implements
//! [`ChatClient`], and every response shape a provider may emit is normalized
//! into one canonical [`StreamChunk`] stream at this boundary.

pub mod prompt;
pub mod rest_client;

use crucible_core::conversation::{ChatMessage, ChatRole};
use crucible_core::error::Result;
use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::{Stream, StreamExt};

pub use rest_client::RestChatClient;

/// A stream of normalized chat completion chunks.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Role-tagged message sequence, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature, provider default when `None`.
    pub temperature: Option<f32>,
    /// Output token cap, provider default when `None`.
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Creates a request with provider-default parameters.
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Shorthand for a system prompt followed by one user message.
    pub fn one_shot(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::system(system), ChatMessage::user(user)])
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the output token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A complete (non-streaming) chat response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    /// The full assistant text.
    pub content: String,
}

/// One normalized chunk of an incrementally delivered response.
///
/// [`StreamChunk::from_raw`] is the single adapter that maps every tolerated
/// provider chunk shape into this type; nothing downstream ever looks at a
/// raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamChunk {
    /// Incremental text, if this chunk carried any.
    pub delta: Option<String>,
    /// Whether the provider marked the response complete.
    pub finished: bool,
}

impl StreamChunk {
    /// Normalizes a raw provider chunk.
    ///
    /// Tolerated shapes, checked in order:
    /// - `choices[0].delta.content` (streaming chat completion)
    /// - `choices[0].message.content` (full chat completion)
    /// - `choices[0].text` (legacy completion)
    /// - `content` (flat)
    ///
    /// A non-null `choices[0].finish_reason` marks the chunk final.
    pub fn from_raw(value: &serde_json::Value) -> Self {
        let choice = value.get("choices").and_then(|c| c.get(0));

        let delta = choice
            .and_then(|c| c.pointer("/delta/content"))
            .or_else(|| choice.and_then(|c| c.pointer("/message/content")))
            .or_else(|| choice.and_then(|c| c.get("text")))
            .or_else(|| value.get("content"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from);

        let finished = choice
            .and_then(|c| c.get("finish_reason"))
            .map(|fr| !fr.is_null())
            .unwrap_or(false);

        Self { delta, finished }
    }

    /// Whether this chunk carries neither text nor a finish marker.
    pub fn is_empty(&self) -> bool {
        self.delta.is_none() && !self.finished
    }
}

/// An async chat completion backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Performs a chat completion and returns the full response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Performs a streaming chat completion.
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream>;
}

/// Drains a chat stream into the full response text.
///
/// A mid-stream error after some text has arrived is logged and the partial
/// text returned; an error before any text propagates.
pub async fn collect_text(mut stream: ChatStream) -> Result<String> {
    let mut text = String::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                if let Some(delta) = chunk.delta {
                    text.push_str(&delta);
                }
                if chunk.finished {
                    break;
                }
            }
            Err(err) if text.is_empty() => return Err(err),
            Err(err) => {
                tracing::warn!("chat stream ended early, keeping partial text: {}", err);
                break;
            }
        }
    }
    Ok(text)
}

/// Wire-role mapping shared by REST backends.
pub(crate) fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}
