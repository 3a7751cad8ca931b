//! Per-turn evaluation model.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Synthetic category used when the rubric provides none.
pub const GENERAL_CATEGORY: &str = "General Performance";

/// How an evaluation attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    /// The observer output parsed (possibly after repair).
    Parsed,
    /// Every repair attempt failed; the raw text is kept for audit purposes.
    ParseError { raw: String },
}

/// A structured grade for one conversational turn.
///
/// Parse failures still produce an entry (score 0.0, outcome `ParseError`)
/// so the evaluation count always matches the attempted-turn count. The
/// aggregator decides what to do with failed entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Index of the turn this evaluation grades. Evaluations complete out of
    /// order, so this is the only reliable attribution.
    pub turn_index: u64,
    /// Rubric category.
    pub category: String,
    /// Score on the canonical 0-10 scale, clamped.
    pub score: f64,
    /// The observer's reasoning.
    pub reasoning: String,
    /// The observer's confidence in its own grade (0.0-1.0).
    pub confidence: f64,
    /// Parse outcome.
    pub outcome: EvaluationOutcome,
}

impl Evaluation {
    /// Creates a parse-error placeholder for a turn whose grading output
    /// could not be repaired.
    pub fn parse_error(turn_index: u64, raw: impl Into<String>) -> Self {
        Self {
            turn_index,
            category: GENERAL_CATEGORY.to_string(),
            score: 0.0,
            reasoning: "Observer output could not be parsed.".to_string(),
            confidence: 0.0,
            outcome: EvaluationOutcome::ParseError { raw: raw.into() },
        }
    }

    /// Whether this entry carries a usable grade.
    pub fn is_parsed(&self) -> bool {
        self.outcome == EvaluationOutcome::Parsed
    }
}

/// Shared, append-only collection of evaluations for one session.
///
/// Evaluation tasks push from detached background tasks; the aggregator
/// drains a snapshot at teardown.
#[derive(Default)]
pub struct EvaluationSink {
    entries: Mutex<Vec<Evaluation>>,
}

impl EvaluationSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an evaluation.
    pub fn push(&self, evaluation: Evaluation) {
        self.lock().push(evaluation);
    }

    /// Returns a snapshot of all evaluations recorded so far.
    pub fn export(&self) -> Vec<Evaluation> {
        self.lock().clone()
    }

    /// Number of evaluations recorded so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no evaluations have been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Evaluation>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_entry_is_flagged() {
        let entry = Evaluation::parse_error(4, "not json at all");
        assert!(!entry.is_parsed());
        assert_eq!(entry.score, 0.0);
        assert_eq!(entry.turn_index, 4);
        match entry.outcome {
            EvaluationOutcome::ParseError { ref raw } => assert_eq!(raw, "not json at all"),
            _ => panic!("expected ParseError outcome"),
        }
    }

    #[test]
    fn test_sink_export_preserves_order() {
        let sink = EvaluationSink::new();
        for i in 0..5 {
            sink.push(Evaluation::parse_error(i, "x"));
        }
        let entries = sink.export();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[3].turn_index, 3);
    }
}
