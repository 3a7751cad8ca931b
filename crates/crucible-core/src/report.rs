//! The final session report (FSIR).
//!
//! Created once at teardown from the evaluation list and the audit log
//! export, then never mutated. All scores are on the canonical 0-10 scale;
//! only a renderer may derive a percentage for display, and it must do so at
//! exactly one place.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The closed set of decision labels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Advance to a human interview.
    Advance,
    /// Do not advance.
    Reject,
}

impl Decision {
    /// Maps an overall score (0-10 scale) to a decision using the given
    /// cutoff. The cutoff is inclusive on the Advance side.
    pub fn from_score(score: f64, cutoff: f64) -> Self {
        if score >= cutoff {
            Decision::Advance
        } else {
            Decision::Reject
        }
    }
}

/// One category row of the report breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Rubric category.
    pub category: String,
    /// Mean score for the category (0-10 scale).
    pub score: f64,
    /// Concatenated reasoning highlights.
    pub reasoning: String,
    /// How many evaluations contributed.
    pub entries: usize,
}

/// One derived timeline row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Relative time since session start, floored to whole seconds,
    /// formatted as `"{n}s"`.
    pub time: String,
    /// Originating actor.
    pub actor: String,
    /// Audit event kind.
    pub kind: String,
    /// Event details.
    pub details: String,
}

/// The aggregate report for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeReport {
    /// Session identifier the artifacts are named by.
    pub session_id: String,
    /// Candidate identifier.
    pub candidate_id: String,
    /// Mean of all successfully parsed evaluation scores (0-10 scale);
    /// 0.0 when nothing parsed.
    pub overall_score: f64,
    /// Decision derived from the overall score.
    pub decision: Decision,
    /// Summary sentence(s). Says "No data collected." when no evaluation
    /// parsed.
    pub summary: String,
    /// Per-category breakdown.
    pub categories: Vec<CategoryScore>,
    /// Timeline derived from the audit log, in insertion order.
    pub timeline: Vec<TimelineEntry>,
    /// Integrity observations (mole baits and similar).
    pub integrity_signals: Vec<String>,
    /// Turns for which an evaluation entry exists (parsed or not).
    pub evaluated_turns: usize,
    /// Evaluation entries excluded from the mean because they failed to
    /// parse.
    pub parse_failures: usize,
    /// RFC 3339 creation timestamp.
    pub generated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_cutoff_is_inclusive() {
        assert_eq!(Decision::from_score(7.0, 7.0), Decision::Advance);
        assert_eq!(Decision::from_score(6.99, 7.0), Decision::Reject);
        assert_eq!(Decision::from_score(9.5, 7.0), Decision::Advance);
    }

    #[test]
    fn test_decision_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&Decision::Advance).unwrap(),
            "\"ADVANCE\""
        );
        assert_eq!(Decision::Reject.to_string(), "REJECT");
    }
}
