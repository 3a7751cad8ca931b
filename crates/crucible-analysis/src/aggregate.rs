//! Score aggregation.
//!
//! One pure function from the evaluation list and the audit log export to
//! the composite report. All scores stay on the canonical 0-10 scale.

use crucible_core::audit::{kind, AuditEvent};
use crucible_core::evaluation::Evaluation;
use crucible_core::report::{CategoryScore, CompositeReport, Decision, TimelineEntry};

/// Audit event kinds that surface on the report timeline.
const TIMELINE_KINDS: &[&str] = &[
    kind::INTERVIEW_START,
    kind::CRISIS_TRIGGERED,
    kind::INTERRUPTION,
    kind::BAIT_OFFERED,
    kind::EVALUATION_COMPLETE,
    kind::GOVERNOR_TRIGGERED,
    kind::INTERVIEW_END,
];

/// How many reasoning snippets a category row carries at most.
const REASONING_CAP: usize = 3;

/// Builds the composite report for a finished session.
///
/// Parse-error evaluations are excluded from the mean and the category
/// breakdown but are counted in `parse_failures`. With zero parsed
/// evaluations the overall score is 0.0 and the summary says no data was
/// collected.
pub fn aggregate(
    session_id: &str,
    candidate_id: &str,
    evaluations: &[Evaluation],
    events: &[AuditEvent],
    decision_cutoff: f64,
) -> CompositeReport {
    let parsed: Vec<&Evaluation> = evaluations.iter().filter(|e| e.is_parsed()).collect();
    let parse_failures = evaluations.len() - parsed.len();

    let overall_score = if parsed.is_empty() {
        0.0
    } else {
        round2(parsed.iter().map(|e| e.score).sum::<f64>() / parsed.len() as f64)
    };

    CompositeReport {
        session_id: session_id.to_string(),
        candidate_id: candidate_id.to_string(),
        overall_score,
        decision: Decision::from_score(overall_score, decision_cutoff),
        summary: summary_text(parsed.len(), overall_score),
        categories: category_breakdown(&parsed),
        timeline: derive_timeline(events),
        integrity_signals: integrity_signals(events),
        evaluated_turns: evaluations.len(),
        parse_failures,
        generated_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn summary_text(parsed_count: usize, overall_score: f64) -> String {
    if parsed_count == 0 {
        return "No data collected.".to_string();
    }

    let mut summary = format!("Evaluated {} interaction points. ", parsed_count);
    if overall_score > 8.0 {
        summary.push_str("Candidate showed strong incident management skills.");
    } else if overall_score > 5.0 {
        summary.push_str("Candidate was competent but lacked speed or precision.");
    } else {
        summary.push_str("Candidate struggled with diagnosis and resolution.");
    }
    summary
}

/// Groups parsed evaluations by category, preserving first-seen order.
fn category_breakdown(parsed: &[&Evaluation]) -> Vec<CategoryScore> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: Vec<Vec<&Evaluation>> = Vec::new();

    for evaluation in parsed {
        match order.iter().position(|c| *c == evaluation.category) {
            Some(index) => buckets[index].push(evaluation),
            None => {
                order.push(evaluation.category.clone());
                buckets.push(vec![evaluation]);
            }
        }
    }

    order
        .into_iter()
        .zip(buckets)
        .map(|(category, entries)| {
            let score = round2(
                entries.iter().map(|e| e.score).sum::<f64>() / entries.len() as f64,
            );
            let reasoning = entries
                .iter()
                .map(|e| e.reasoning.as_str())
                .filter(|r| !r.is_empty())
                .take(REASONING_CAP)
                .collect::<Vec<_>>()
                .join("; ");
            CategoryScore {
                category,
                score,
                reasoning,
                entries: entries.len(),
            }
        })
        .collect()
}

/// Walks the audit export in insertion order and keeps the domain-relevant
/// kinds. Relative time is floored whole seconds since session start; ties
/// keep insertion order because the walk is stable.
fn derive_timeline(events: &[AuditEvent]) -> Vec<TimelineEntry> {
    let session_start = events
        .iter()
        .find(|e| e.kind == kind::SESSION_START)
        .or_else(|| events.first())
        .map(|e| e.timestamp)
        .unwrap_or(0.0);

    events
        .iter()
        .filter(|e| TIMELINE_KINDS.contains(&e.kind.as_str()))
        .map(|e| {
            let relative = (e.timestamp - session_start).max(0.0).floor() as u64;
            TimelineEntry {
                time: format!("{relative}s"),
                actor: e.actor.clone(),
                kind: e.kind.clone(),
                details: e.details.clone(),
            }
        })
        .collect()
}

fn integrity_signals(events: &[AuditEvent]) -> Vec<String> {
    let signals: Vec<String> = events
        .iter()
        .filter(|e| e.kind == kind::BAIT_OFFERED)
        .map(|e| format!("Mole bait offered: {}", e.details))
        .collect();

    if signals.is_empty() {
        vec!["No integrity flags observed.".to_string()]
    } else {
        signals
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
