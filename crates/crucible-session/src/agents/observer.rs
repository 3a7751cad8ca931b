//! The silent observer.
//!
//! Grades every candidate turn in the background. Evaluation never blocks
//! the conversation: each turn spawns a detached-but-tracked task that calls
//! the chat backend, repairs its output and records the result. Evaluations
//! may complete out of order; the turn index in each entry and audit event
//! keeps attribution intact.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crucible_analysis::repair::repair_and_parse;
use crucible_core::audit::{kind, AuditLog};
use crucible_core::error::Result;
use crucible_core::evaluation::{Evaluation, EvaluationOutcome, EvaluationSink};
use crucible_interaction::{collect_text, prompt, ChatClient, ChatRequest};
use tracing::debug;

use crate::registry::TaskRegistry;

const ACTOR: &str = "ObserverAgent";

/// The silent evaluator. Listens to turns and grades them asynchronously.
pub struct ObserverAgent {
    chat: Arc<dyn ChatClient>,
    audit: Arc<AuditLog>,
    evaluations: Arc<EvaluationSink>,
    system_prompt: String,
    turn_counter: AtomicU64,
}

impl ObserverAgent {
    /// Creates the observer with the rubric for the given metrics.
    pub fn new(
        chat: Arc<dyn ChatClient>,
        audit: Arc<AuditLog>,
        evaluations: Arc<EvaluationSink>,
        metrics: &[String],
    ) -> Result<Self> {
        let system_prompt = prompt::observer_system(metrics)?;
        Ok(Self {
            chat,
            audit,
            evaluations,
            system_prompt,
            turn_counter: AtomicU64::new(0),
        })
    }

    /// Schedules an evaluation for a completed turn. Returns immediately.
    pub fn observe_turn(&self, registry: &TaskRegistry, speaker: &str, text: &str) {
        let turn_index = self.turn_counter.fetch_add(1, Ordering::SeqCst);
        debug!(turn_index, speaker, "observer scheduling evaluation");

        let chat = self.chat.clone();
        let audit = self.audit.clone();
        let evaluations = self.evaluations.clone();
        let system_prompt = self.system_prompt.clone();
        let text = text.to_string();

        registry.spawn(format!("evaluate-turn-{turn_index}"), async move {
            Self::evaluate(chat, audit, evaluations, system_prompt, turn_index, text).await;
        });
    }

    /// Number of turns handed to the observer so far.
    pub fn turns_observed(&self) -> u64 {
        self.turn_counter.load(Ordering::SeqCst)
    }

    async fn evaluate(
        chat: Arc<dyn ChatClient>,
        audit: Arc<AuditLog>,
        evaluations: Arc<EvaluationSink>,
        system_prompt: String,
        turn_index: u64,
        text: String,
    ) {
        let request = ChatRequest::one_shot(system_prompt, format!("Evaluate this turn: '{text}'"))
            .with_temperature(0.0);

        let raw = match chat.chat_stream(request).await {
            Ok(stream) => match collect_text(stream).await {
                Ok(raw) => raw,
                Err(err) => {
                    audit.log_with_metadata(
                        ACTOR,
                        kind::EVALUATION_FAILED,
                        "Evaluation stream failed",
                        serde_json::json!({"turn_index": turn_index, "error": err.to_string()}),
                    );
                    return;
                }
            },
            Err(err) => {
                audit.log_with_metadata(
                    ACTOR,
                    kind::EVALUATION_FAILED,
                    "Evaluation call failed",
                    serde_json::json!({"turn_index": turn_index, "error": err.to_string()}),
                );
                return;
            }
        };

        match repair_and_parse(&raw) {
            Some(parsed) => {
                audit.log_with_metadata(
                    ACTOR,
                    kind::EVALUATION_COMPLETE,
                    "Turn evaluated",
                    serde_json::json!({
                        "turn_index": turn_index,
                        "category": parsed.category,
                        "score": parsed.score,
                        "confidence": parsed.confidence,
                        "evaluated_text": text,
                    }),
                );
                evaluations.push(Evaluation {
                    turn_index,
                    category: parsed.category,
                    score: parsed.score,
                    reasoning: parsed.reasoning,
                    confidence: parsed.confidence,
                    outcome: EvaluationOutcome::Parsed,
                });
            }
            None => {
                audit.log_with_metadata(
                    ACTOR,
                    kind::EVALUATION_PARSE_ERROR,
                    "Could not parse observer output",
                    serde_json::json!({"turn_index": turn_index, "raw": raw}),
                );
                evaluations.push(Evaluation::parse_error(turn_index, raw));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockChatClient;
    use std::time::Duration;

    async fn run_observer(responses: Vec<&str>, turns: Vec<&str>) -> (Arc<EvaluationSink>, Arc<AuditLog>) {
        let chat = Arc::new(MockChatClient::with_responses(responses));
        let audit = Arc::new(AuditLog::new("s", "c"));
        let sink = Arc::new(EvaluationSink::new());
        let registry = TaskRegistry::new();

        let observer =
            ObserverAgent::new(chat, audit.clone(), sink.clone(), &[]).unwrap();
        for turn in turns {
            observer.observe_turn(&registry, "candidate", turn);
        }
        registry.shutdown(Duration::from_secs(5)).await;
        (sink, audit)
    }

    #[tokio::test]
    async fn test_parsed_evaluation_is_recorded_with_attribution() {
        let (sink, audit) = run_observer(
            vec![r#"{"score": 8, "reasoning": "checked the logs", "confidence": 0.9}"#],
            vec!["I would start with the slow query log"],
        )
        .await;

        let evaluations = sink.export();
        assert_eq!(evaluations.len(), 1);
        assert_eq!(evaluations[0].score, 8.0);
        assert_eq!(evaluations[0].turn_index, 0);
        assert!(evaluations[0].is_parsed());

        let complete: Vec<_> = audit
            .export()
            .into_iter()
            .filter(|e| e.kind == kind::EVALUATION_COMPLETE)
            .collect();
        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0].metadata["turn_index"], serde_json::json!(0));
        assert!(complete[0].metadata["evaluated_text"]
            .as_str()
            .unwrap()
            .contains("slow query log"));
    }

    #[tokio::test]
    async fn test_unparseable_output_becomes_parse_error_entry() {
        let (sink, audit) = run_observer(
            vec!["the candidate seemed fine I guess"],
            vec!["some answer"],
        )
        .await;

        let evaluations = sink.export();
        assert_eq!(evaluations.len(), 1);
        assert!(!evaluations[0].is_parsed());

        assert!(audit
            .export()
            .iter()
            .any(|e| e.kind == kind::EVALUATION_PARSE_ERROR));
    }

    #[tokio::test]
    async fn test_chat_failure_is_swallowed_and_logged() {
        let chat = Arc::new(MockChatClient::failing());
        let audit = Arc::new(AuditLog::new("s", "c"));
        let sink = Arc::new(EvaluationSink::new());
        let registry = TaskRegistry::new();

        let observer = ObserverAgent::new(chat, audit.clone(), sink.clone(), &[]).unwrap();
        observer.observe_turn(&registry, "candidate", "hello");
        registry.shutdown(Duration::from_secs(5)).await;

        assert!(sink.is_empty());
        assert!(audit
            .export()
            .iter()
            .any(|e| e.kind == kind::EVALUATION_FAILED));
    }

    #[tokio::test]
    async fn test_turn_indices_increment() {
        let (sink, _) = run_observer(
            vec![r#"{"score": 5}"#, r#"{"score": 6}"#],
            vec!["first", "second"],
        )
        .await;

        let mut indices: Vec<u64> = sink.export().iter().map(|e| e.turn_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1]);
    }
}
