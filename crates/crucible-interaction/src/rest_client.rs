//! RestChatClient - Direct REST implementation of [`ChatClient`].
//!
//! Talks to an OpenAI-compatible `/chat/completions` endpoint (the hosted
//! low-latency provider by default) without any SDK dependency.
//! Configuration priority: ~/.config/crucible/secret.json > environment
//! variables.

use std::collections::VecDeque;
use std::env;

use async_trait::async_trait;
use crucible_core::error::{CrucibleError, Result};
use crucible_infrastructure::storage::SecretStorage;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{role_str, ChatClient, ChatRequest, ChatResponse, ChatStream, StreamChunk};

const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Chat client that talks to an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct RestChatClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl RestChatClient {
    /// Creates a new client with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Loads configuration from ~/.config/crucible/secret.json or
    /// environment variables.
    ///
    /// Priority:
    /// 1. ~/.config/crucible/secret.json
    /// 2. Environment variables (CRUCIBLE_API_KEY, CRUCIBLE_CHAT_MODEL,
    ///    CRUCIBLE_CHAT_BASE_URL)
    ///
    /// Model name defaults to `llama-3.1-8b-instant` if not specified.
    pub fn try_from_env() -> Result<Self> {
        // Try loading from SecretStorage first
        if let Ok(storage) = SecretStorage::new() {
            if let Ok(secrets) = storage.load() {
                if let Some(chat) = secrets.chat {
                    let model = chat.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
                    let mut client = Self::new(chat.api_key, model);
                    if let Some(base_url) = chat.base_url {
                        client.base_url = base_url;
                    }
                    return Ok(client);
                }
            }
        }

        // Fallback to environment variables
        let api_key = env::var("CRUCIBLE_API_KEY").map_err(|_| {
            CrucibleError::config(
                "CRUCIBLE_API_KEY not found in ~/.config/crucible/secret.json or environment variables",
            )
        })?;

        let model = env::var("CRUCIBLE_CHAT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        let mut client = Self::new(api_key, model);
        if let Ok(base_url) = env::var("CRUCIBLE_CHAT_BASE_URL") {
            client.base_url = base_url;
        }
        Ok(client)
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the endpoint URL after construction.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_body(&self, request: &ChatRequest, stream: bool) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: role_str(m.role).to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn send(&self, body: &CompletionRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| CrucibleError::provider(format!("chat request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatClient for RestChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let body = self.build_body(&request, false);
        let response = self.send(&body).await?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|err| CrucibleError::provider(format!("failed to parse chat response: {err}")))?;

        // The same adapter that normalizes stream chunks also handles the
        // full-response shape.
        let chunk = StreamChunk::from_raw(&value);
        let content = chunk.delta.ok_or_else(|| {
            CrucibleError::provider("chat response carried no text content")
        })?;

        Ok(ChatResponse { content })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let body = self.build_body(&request, true);
        let response = self.send(&body).await?;

        let bytes = response
            .bytes_stream()
            .map(|item| item.map(|b| b.to_vec()))
            .boxed();

        Ok(Box::pin(futures_util::stream::unfold(
            SseState::new(bytes),
            |mut state| async move { state.next_chunk().await.map(|item| (item, state)) },
        )))
    }
}

/// Incremental decoder for `data: {...}` server-sent event lines.
///
/// Provider chunks can split lines arbitrarily, so raw bytes accumulate in a
/// buffer and complete lines are drained from it.
struct SseState {
    inner: BoxStream<'static, std::result::Result<Vec<u8>, reqwest::Error>>,
    buffer: String,
    pending: VecDeque<StreamChunk>,
    done: bool,
}

impl SseState {
    fn new(inner: BoxStream<'static, std::result::Result<Vec<u8>, reqwest::Error>>) -> Self {
        Self {
            inner,
            buffer: String::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    async fn next_chunk(&mut self) -> Option<Result<StreamChunk>> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(Ok(chunk));
            }
            if self.done {
                return None;
            }

            match self.inner.next().await {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(CrucibleError::provider(format!(
                        "chat stream failed: {err}"
                    ))));
                }
                Some(Ok(bytes)) => {
                    self.buffer.push_str(&String::from_utf8_lossy(&bytes));
                    self.drain_complete_lines();
                }
            }
        }
    }

    fn drain_complete_lines(&mut self) {
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim();
            let Some(data) = line.strip_prefix("data:") else {
                // Keep-alives and event-name lines are skipped.
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                self.done = true;
                self.pending.push_back(StreamChunk {
                    delta: None,
                    finished: true,
                });
                return;
            }
            match serde_json::from_str::<serde_json::Value>(data) {
                Ok(value) => {
                    let chunk = StreamChunk::from_raw(&value);
                    if !chunk.is_empty() {
                        self.pending.push_back(chunk);
                    }
                }
                Err(err) => {
                    tracing::debug!("skipping undecodable stream line: {}", err);
                }
            }
        }
    }
}

fn map_http_error(status: StatusCode, body: String) -> CrucibleError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);
    CrucibleError::provider(format!("chat API returned {status}: {message}"))
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
