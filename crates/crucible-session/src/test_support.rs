//! Shared mocks for session tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use crucible_core::error::{CrucibleError, Result};
use crucible_interaction::{ChatClient, ChatRequest, ChatResponse, ChatStream, StreamChunk};

use crate::transport::RoomTransport;

/// Chat backend returning scripted responses.
pub(crate) struct MockChatClient {
    responses: Mutex<VecDeque<String>>,
    default: Option<String>,
    fail: bool,
}

impl MockChatClient {
    /// Pops one scripted response per call; errors when exhausted.
    pub fn with_responses(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            default: None,
            fail: false,
        }
    }

    /// Returns the same response for every call.
    pub fn always(text: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default: Some(text.to_string()),
            fail: false,
        }
    }

    /// Fails every call.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default: None,
            fail: true,
        }
    }

    fn next_response(&self) -> Result<String> {
        if self.fail {
            return Err(CrucibleError::provider("mock backend down"));
        }
        let scripted = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        scripted
            .or_else(|| self.default.clone())
            .ok_or_else(|| CrucibleError::provider("mock backend out of responses"))
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        Ok(ChatResponse {
            content: self.next_response()?,
        })
    }

    async fn chat_stream(&self, _request: ChatRequest) -> Result<ChatStream> {
        let content = self.next_response()?;
        let chunks: Vec<Result<StreamChunk>> = vec![Ok(StreamChunk {
            delta: Some(content),
            finished: true,
        })];
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }
}

/// Transport that records everything spoken and published.
pub(crate) struct RecordingTransport {
    spoken: Mutex<Vec<String>>,
    signals: Mutex<Vec<serde_json::Value>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
            signals: Mutex::new(Vec::new()),
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn signals(&self) -> Vec<serde_json::Value> {
        self.signals.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of published signals carrying the given `type` discriminator.
    pub fn signals_of_type(&self, signal_type: &str) -> usize {
        self.signals()
            .iter()
            .filter(|s| s["type"] == signal_type)
            .count()
    }
}

#[async_trait]
impl RoomTransport for RecordingTransport {
    async fn publish_data(&self, payload: Vec<u8>) -> Result<()> {
        let value: serde_json::Value = serde_json::from_slice(&payload)?;
        self.signals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(value);
        Ok(())
    }

    async fn say(&self, text: &str) -> Result<()> {
        self.spoken
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(())
    }
}
