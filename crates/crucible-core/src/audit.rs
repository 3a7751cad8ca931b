//! Session audit log.
//!
//! The audit log is the "black box" recording of an interview session. Every
//! component appends timestamped events to it; nothing is ever rewritten or
//! reordered. Insertion order is the only total order in the system and the
//! final report timeline is derived from it.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Well-known event kinds recorded by the session components.
///
/// Kinds are plain strings on the wire so collaborators can add their own,
/// but everything the report pipeline keys on is listed here.
pub mod kind {
    pub const SESSION_START: &str = "SESSION_START";
    pub const SESSION_END: &str = "SESSION_END";
    pub const INTERVIEW_START: &str = "INTERVIEW_START";
    pub const INTERVIEW_END: &str = "INTERVIEW_END";
    pub const TRANSCRIPT: &str = "TRANSCRIPT";
    pub const CRISIS_TRIGGERED: &str = "CRISIS_TRIGGERED";
    pub const INTERRUPTION: &str = "INTERRUPTION";
    pub const BAIT_OFFERED: &str = "BAIT_OFFERED";
    pub const EVALUATION_COMPLETE: &str = "EVALUATION_COMPLETE";
    pub const EVALUATION_PARSE_ERROR: &str = "EVALUATION_PARSE_ERROR";
    pub const EVALUATION_FAILED: &str = "EVALUATION_FAILED";
    pub const TIMER_CANCELLED: &str = "TIMER_CANCELLED";
    pub const TIME_WARNING: &str = "TIME_WARNING";
    pub const GOVERNOR_TRIGGERED: &str = "GOVERNOR_TRIGGERED";
}

/// A single immutable entry in the session timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unix timestamp in seconds (fractional).
    pub timestamp: f64,
    /// Which component produced the event (e.g. "Candidate", "MoleAgent").
    pub actor: String,
    /// Event kind, usually one of [`kind`].
    pub kind: String,
    /// Human-readable details.
    pub details: String,
    /// Structured payload for downstream analysis.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Centralized, append-only logger for a single interview session.
///
/// Logging is best-effort and infallible: a poisoned lock is recovered rather
/// than propagated, so no caller can crash on a log call. External
/// persistence is a collaborator concern; this log lives in memory for the
/// lifetime of the session.
pub struct AuditLog {
    session_id: String,
    candidate_id: String,
    started_at: f64,
    events: Mutex<Vec<AuditEvent>>,
}

impl AuditLog {
    /// Creates a new audit log for the given session.
    pub fn new(session_id: impl Into<String>, candidate_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            candidate_id: candidate_id.into(),
            started_at: now_unix(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Returns the session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns the candidate identifier.
    pub fn candidate_id(&self) -> &str {
        &self.candidate_id
    }

    /// Unix timestamp at which this log (and so the session) was created.
    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    /// Records an event in the session timeline.
    pub fn log(&self, actor: &str, kind: &str, details: impl Into<String>) {
        self.push(AuditEvent {
            timestamp: now_unix(),
            actor: actor.to_string(),
            kind: kind.to_string(),
            details: details.into(),
            metadata: serde_json::Map::new(),
        });
    }

    /// Records an event with a structured metadata payload.
    ///
    /// Non-object metadata values are wrapped under a `"value"` key so the
    /// entry shape stays uniform.
    pub fn log_with_metadata(
        &self,
        actor: &str,
        kind: &str,
        details: impl Into<String>,
        metadata: serde_json::Value,
    ) {
        let metadata = match metadata {
            serde_json::Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        self.push(AuditEvent {
            timestamp: now_unix(),
            actor: actor.to_string(),
            kind: kind.to_string(),
            details: details.into(),
            metadata,
        });
    }

    /// Exports a stable snapshot of all events in insertion order.
    pub fn export(&self) -> Vec<AuditEvent> {
        self.lock().clone()
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether any events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn push(&self, event: AuditEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AuditEvent>> {
        // A poisoned lock only means a panic happened mid-append elsewhere;
        // the vector itself is still usable.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Current unix time in fractional seconds.
pub fn now_unix() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_millis()) / 1000.0
}
