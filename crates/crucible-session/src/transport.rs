//! Transport collaborator boundary.
//!
//! The room/voice layer is a black box behind [`RoomTransport`]: the core
//! needs a reliable out-of-band data send and a speak-aloud primitive, and
//! receives finalized transcripts over an mpsc channel.

use async_trait::async_trait;
use crucible_core::error::Result;
use crucible_core::signal::FrontendSignal;
use tracing::warn;

/// A finalized transcribed utterance delivered by the transport.
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    /// Speaker label (usually the candidate).
    pub speaker: String,
    /// The transcribed text.
    pub text: String,
    /// Transcription confidence, 0.0-1.0.
    pub confidence: f64,
    /// Whether this is a finalized transcript; interim results are ignored.
    pub is_final: bool,
}

impl TranscriptEvent {
    /// A finalized candidate utterance with full confidence.
    pub fn candidate(text: impl Into<String>) -> Self {
        Self {
            speaker: "candidate".to_string(),
            text: text.into(),
            confidence: 1.0,
            is_final: true,
        }
    }

    /// Sets the transcription confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

/// The room/voice collaborator.
#[async_trait]
pub trait RoomTransport: Send + Sync {
    /// Reliably sends an out-of-band data payload to the frontend.
    async fn publish_data(&self, payload: Vec<u8>) -> Result<()>;

    /// Speaks text aloud to the candidate.
    async fn say(&self, text: &str) -> Result<()>;
}

/// Serializes and publishes a frontend signal.
///
/// Failures are logged and swallowed: a dropped visual signal degrades the
/// experience but never the session.
pub async fn send_signal(transport: &dyn RoomTransport, signal: &FrontendSignal) {
    match signal.to_bytes() {
        Ok(payload) => {
            if let Err(err) = transport.publish_data(payload).await {
                warn!("failed to publish frontend signal: {}", err);
            }
        }
        Err(err) => warn!("failed to serialize frontend signal: {}", err),
    }
}
