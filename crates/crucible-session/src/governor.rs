//! Safety governor.
//!
//! Watches every candidate turn for high-risk content and for sustained
//! low-confidence transcription, and can force the session to end.

use std::sync::atomic::{AtomicUsize, Ordering};

use crucible_core::config::SessionConfig;
use tracing::warn;

/// The safety valve. Returns `false` from [`check`](Governor::check) when a
/// human needs to take over.
pub struct Governor {
    keywords: Vec<String>,
    confidence_threshold: f64,
    streak_limit: usize,
    consecutive_low: AtomicUsize,
}

impl Governor {
    /// Creates a governor from session config.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            keywords: config
                .governor_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            confidence_threshold: config.governor_confidence_threshold,
            streak_limit: config.governor_streak_limit.max(1),
            consecutive_low: AtomicUsize::new(0),
        }
    }

    /// Checks one turn. Returns `true` if the session is safe to continue.
    ///
    /// Any high-risk keyword fails the check immediately, regardless of
    /// confidence. Otherwise consecutive low-confidence turns accumulate and
    /// the check fails on the turn that reaches the streak limit; a turn at
    /// or above the threshold resets the streak.
    pub fn check(&self, transcript: &str, confidence: f64) -> bool {
        let lowered = transcript.to_lowercase();
        for keyword in &self.keywords {
            if lowered.contains(keyword) {
                warn!(keyword = %keyword, "governor trigger: high risk keyword detected");
                return false;
            }
        }

        if confidence < self.confidence_threshold {
            let streak = self.consecutive_low.fetch_add(1, Ordering::SeqCst) + 1;
            warn!(confidence, streak, "governor warning: low confidence turn");
            if streak >= self.streak_limit {
                warn!("governor trigger: too many low confidence turns");
                return false;
            }
        } else {
            self.consecutive_low.store(0, Ordering::SeqCst);
        }

        true
    }

    /// Current low-confidence streak (for diagnostics).
    pub fn low_confidence_streak(&self) -> usize {
        self.consecutive_low.load(Ordering::SeqCst)
    }
}
