//! The session coordinator.
//!
//! Owns one interview session end to end: builds the persona panel, starts
//! the background agents through the task registry, routes finalized
//! transcripts, and tears everything down into the composite report.
//!
//! Lifecycle: `Starting -> Active -> Ending -> Ended`. Shutdown is
//! idempotent; finalize runs exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crucible_analysis::aggregate::aggregate;
use crucible_analysis::render::{MarkdownReportRenderer, ReportRenderer};
use crucible_core::audit::{kind, AuditLog};
use crucible_core::config::SessionConfig;
use crucible_core::conversation::{ChatMessage, ConversationContext};
use crucible_core::error::{CrucibleError, Result};
use crucible_core::evaluation::EvaluationSink;
use crucible_core::persona::CandidateProfile;
use crucible_core::report::CompositeReport;
use crucible_core::scenario::Scenario;
use crucible_core::signal::FrontendSignal;
use crucible_infrastructure::ArtifactStore;
use crucible_interaction::{prompt, ChatClient};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::agents::{CrisisPopupAgent, InterviewClock, MoleAgent, ObserverAgent, PressureAgent};
use crate::end_detector;
use crate::governor::Governor;
use crate::registry::TaskRegistry;
use crate::transport::{send_signal, RoomTransport, TranscriptEvent};

/// Lifecycle states of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed but not started.
    Starting,
    /// Routing transcripts.
    Active,
    /// Graceful shutdown in progress.
    Ending,
    /// Torn down; ready to finalize.
    Ended,
}

/// The persona panel backing one session.
struct Panel {
    observer: Option<Arc<ObserverAgent>>,
    crisis: Option<Arc<CrisisPopupAgent>>,
    pressure: Option<Arc<PressureAgent>>,
    mole: Option<MoleAgent>,
    minimal: bool,
}

/// Coordinates one interview session.
pub struct SessionCoordinator {
    scenario: Scenario,
    config: SessionConfig,
    candidate: RwLock<CandidateProfile>,
    transport: Arc<dyn RoomTransport>,
    audit: Arc<AuditLog>,
    context: Arc<ConversationContext>,
    evaluations: Arc<EvaluationSink>,
    registry: TaskRegistry,
    governor: Governor,
    panel: Panel,
    renderer: Box<dyn ReportRenderer>,
    artifacts: Option<ArtifactStore>,
    state: Mutex<SessionState>,
    shutdown_started: AtomicBool,
    finalized: AtomicBool,
    /// Level-triggered "session ended" flag for the run loop.
    done: CancellationToken,
}

impl SessionCoordinator {
    /// Creates a coordinator for one session.
    ///
    /// Panel wiring failures are not fatal: the session degrades to a
    /// minimal lead-only panel rather than aborting, and the degradation is
    /// recorded on the audit trail at start.
    pub fn new(
        session_id: impl Into<String>,
        scenario: Scenario,
        candidate: CandidateProfile,
        config: SessionConfig,
        chat: Arc<dyn ChatClient>,
        transport: Arc<dyn RoomTransport>,
        artifacts: Option<ArtifactStore>,
    ) -> Self {
        let candidate_id = if candidate.has_name() {
            candidate.name.to_lowercase().replace(' ', "-")
        } else {
            "unknown_candidate".to_string()
        };
        let audit = Arc::new(AuditLog::new(session_id, candidate_id));
        let context = Arc::new(ConversationContext::new());
        let evaluations = Arc::new(EvaluationSink::new());
        let governor = Governor::new(&config);

        let panel = Self::build_panel(
            &scenario,
            &candidate,
            &config,
            &chat,
            &transport,
            &audit,
            &context,
            &evaluations,
        );

        Self {
            scenario,
            config,
            candidate: RwLock::new(candidate),
            transport,
            audit,
            context,
            evaluations,
            registry: TaskRegistry::new(),
            governor,
            panel,
            renderer: Box::new(MarkdownReportRenderer::new()),
            artifacts,
            state: Mutex::new(SessionState::Starting),
            shutdown_started: AtomicBool::new(false),
            finalized: AtomicBool::new(false),
            done: CancellationToken::new(),
        }
    }

    /// Swaps in a different report renderer (e.g. the PDF collaborator).
    pub fn with_renderer(mut self, renderer: Box<dyn ReportRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    #[allow(clippy::too_many_arguments)]
    fn build_panel(
        scenario: &Scenario,
        candidate: &CandidateProfile,
        config: &SessionConfig,
        chat: &Arc<dyn ChatClient>,
        transport: &Arc<dyn RoomTransport>,
        audit: &Arc<AuditLog>,
        context: &Arc<ConversationContext>,
        evaluations: &Arc<EvaluationSink>,
    ) -> Panel {
        match ObserverAgent::new(
            chat.clone(),
            audit.clone(),
            evaluations.clone(),
            &scenario.observer_metrics,
        ) {
            Ok(observer) => Panel {
                observer: Some(Arc::new(observer)),
                crisis: Some(Arc::new(CrisisPopupAgent::new(
                    chat.clone(),
                    transport.clone(),
                    context.clone(),
                    audit.clone(),
                    scenario.domain.clone(),
                    candidate.clone(),
                    config,
                ))),
                pressure: Some(Arc::new(PressureAgent::new(
                    transport.clone(),
                    audit.clone(),
                    &scenario.stakeholder_persona,
                    config,
                ))),
                mole: scenario
                    .mole_persona
                    .as_ref()
                    .map(|_| MoleAgent::new(audit.clone(), config)),
                minimal: false,
            },
            Err(err) => {
                error!(
                    "panel wiring failed, falling back to a minimal lead-only session: {}",
                    err
                );
                Panel {
                    observer: None,
                    crisis: None,
                    pressure: None,
                    mole: None,
                    minimal: true,
                }
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: SessionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }

    /// The session's audit log.
    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    /// The shared conversation context.
    pub fn context(&self) -> &Arc<ConversationContext> {
        &self.context
    }

    /// Starts the session: seeds the conversation, arms all background
    /// agents and speaks the opening line.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if self.state() != SessionState::Starting {
            return Err(CrucibleError::session("session already started"));
        }

        self.audit.log_with_metadata(
            "System",
            kind::SESSION_START,
            "Interview session initialized",
            serde_json::json!({
                "scenario": self.scenario.id,
                "minimal_panel": self.panel.minimal,
            }),
        );

        let candidate = self.candidate.read().await.clone();
        let lead_prompt = prompt::lead_system(&self.scenario, &candidate).unwrap_or_else(|err| {
            warn!("lead prompt render failed, using generic prompt: {}", err);
            format!(
                "You are {}, running an incident interview. Incident: {}",
                self.scenario.lead_persona.name, self.scenario.initial_problem
            )
        });
        self.context.append(ChatMessage::system(lead_prompt)).await;

        if let Some(crisis) = &self.panel.crisis {
            crisis.start(&self.registry);
        }
        if let Some(pressure) = &self.panel.pressure {
            pressure.start(&self.registry);
        }
        if let Some(mole) = &self.panel.mole {
            mole.start(&self.registry);
        }

        let warning_transport = self.transport.clone();
        let coordinator = Arc::clone(self);
        InterviewClock::start(
            &self.registry,
            self.audit.clone(),
            &self.config,
            move || async move {
                if let Err(err) = warning_transport
                    .say("Quick time check: about five minutes left. Let's start wrapping up.")
                    .await
                {
                    warn!("time warning failed to air: {}", err);
                }
            },
            move || async move {
                coordinator.spawn_shutdown("time_limit_reached");
            },
        );

        let opening = if candidate.has_name() {
            format!(
                "Hello {}, I am {}. We have an incident. {}",
                candidate.name, self.scenario.lead_persona.name, self.scenario.initial_problem
            )
        } else {
            format!(
                "Hello, I am {}. We have an incident. {}",
                self.scenario.lead_persona.name, self.scenario.initial_problem
            )
        };
        self.audit.log(
            "IncidentLead",
            kind::INTERVIEW_START,
            format!(
                "Started interview with problem: {}",
                self.scenario.initial_problem
            ),
        );
        if let Err(err) = self.transport.say(&opening).await {
            warn!("opening line failed to air: {}", err);
        }
        self.context.append(ChatMessage::assistant(opening)).await;

        self.set_state(SessionState::Active);
        info!(scenario = %self.scenario.id, "session active");
        Ok(())
    }

    /// Routes one finalized transcribed utterance.
    ///
    /// Every utterance goes to the audit log, the shared context and the
    /// observer; the termination-phrase detector and the safety governor may
    /// end the session.
    pub async fn handle_transcript(self: &Arc<Self>, event: TranscriptEvent) {
        if !event.is_final {
            return;
        }
        let text = event.text.trim();
        if text.is_empty() {
            return;
        }
        if self.state() != SessionState::Active {
            debug!("transcript dropped outside Active state");
            return;
        }

        self.audit.log("Candidate", kind::TRANSCRIPT, text);
        self.context.append(ChatMessage::user(text)).await;

        if let Some(observer) = &self.panel.observer {
            observer.observe_turn(&self.registry, &event.speaker, text);
        }

        if end_detector::check_end_phrase(text) {
            info!("termination phrase detected");
            self.shutdown("candidate_request").await;
            return;
        }

        if !self.governor.check(text, event.confidence) {
            self.audit.log(
                "Governor",
                kind::GOVERNOR_TRIGGERED,
                "Safety check failed, forcing session end",
            );
            self.shutdown("governor_intervention").await;
        }
    }

    /// Injects a late-arriving candidate profile.
    ///
    /// The lead's system prompt is re-rendered and swapped in atomically;
    /// in-flight readers keep their old snapshot.
    pub async fn set_candidate_profile(&self, profile: CandidateProfile) {
        self.audit.log(
            "System",
            "PROFILE_LOADED",
            format!("Candidate profile loaded for {}", profile.name),
        );
        *self.candidate.write().await = profile.clone();

        match prompt::lead_system(&self.scenario, &profile) {
            Ok(prompt_text) => self.context.replace_system_prompt(prompt_text).await,
            Err(err) => warn!("could not personalize lead prompt: {}", err),
        }
    }

    /// Gracefully ends the session. Idempotent: every call after the first
    /// is a no-op, so the interview clock and a candidate request can race
    /// freely.
    pub async fn shutdown(self: &Arc<Self>, reason: &str) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(reason, "session shutting down");
        self.set_state(SessionState::Ending);

        // All timers and loops unwind before the report can be generated.
        self.registry
            .shutdown(Duration::from_secs(self.config.task_grace_secs))
            .await;

        self.audit.log(
            "System",
            kind::INTERVIEW_END,
            format!("Interview ended: {reason}"),
        );

        // The goodbye is nice to have; teardown proceeds with or without it.
        let candidate = self.candidate.read().await.clone();
        let goodbye = end_detector::goodbye_message(&candidate);
        match tokio::time::timeout(
            Duration::from_secs(self.config.goodbye_timeout_secs),
            self.transport.say(&goodbye),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("goodbye failed to air: {}", err),
            Err(_) => warn!("goodbye timed out, proceeding with teardown"),
        }

        send_signal(
            &*self.transport,
            &FrontendSignal::InterviewEnd {
                reason: reason.to_string(),
            },
        )
        .await;

        self.set_state(SessionState::Ended);
        self.done.cancel();
    }

    /// Spawns shutdown outside the registry.
    ///
    /// Background agents must use this instead of awaiting [`shutdown`]
    /// directly: the shutdown path joins every registry task, including the
    /// caller's own.
    fn spawn_shutdown(self: &Arc<Self>, reason: &'static str) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.shutdown(reason).await;
        });
    }

    /// Aggregates, renders and persists the session artifacts. Runs exactly
    /// once, after the session has ended.
    pub async fn finalize(&self) -> Result<CompositeReport> {
        if self.state() != SessionState::Ended {
            return Err(CrucibleError::session(
                "finalize called before the session ended",
            ));
        }
        if self.finalized.swap(true, Ordering::SeqCst) {
            return Err(CrucibleError::session("session already finalized"));
        }

        self.audit
            .log("System", kind::SESSION_END, "Interview session ended");

        let report = aggregate(
            self.audit.session_id(),
            self.audit.candidate_id(),
            &self.evaluations.export(),
            &self.audit.export(),
            self.config.decision_cutoff,
        );

        let document = self.renderer.render(&report)?;
        if let Some(store) = &self.artifacts {
            // Artifact persistence is best effort; the report is still
            // returned to the caller.
            if let Err(err) = store.save(&report, &document) {
                error!("failed to persist session artifacts: {}", err);
            }
        }

        info!(
            overall = report.overall_score,
            decision = %report.decision,
            "session finalized"
        );
        Ok(report)
    }

    /// Drives a whole session: start, route transcripts until the session
    /// ends (candidate request, governor, clock, or transport close), then
    /// finalize.
    pub async fn run(
        self: &Arc<Self>,
        mut transcripts: mpsc::Receiver<TranscriptEvent>,
    ) -> Result<CompositeReport> {
        self.start().await?;

        loop {
            tokio::select! {
                _ = self.done.cancelled() => break,
                maybe = transcripts.recv() => match maybe {
                    Some(event) => self.handle_transcript(event).await,
                    None => {
                        self.shutdown("transport_closed").await;
                        break;
                    }
                },
            }
        }

        // No-op when a shutdown already completed inside the loop.
        self.shutdown("transport_closed").await;
        self.finalize().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockChatClient, RecordingTransport};
    use crucible_infrastructure::TomlScenarioRepository;

    fn scenario() -> Scenario {
        TomlScenarioRepository::embedded_default().unwrap()
    }

    fn coordinator(
        chat: MockChatClient,
    ) -> (Arc<SessionCoordinator>, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let coordinator = Arc::new(SessionCoordinator::new(
            "session-1",
            scenario(),
            CandidateProfile::default(),
            SessionConfig::default(),
            Arc::new(chat),
            transport.clone(),
            None,
        ));
        (coordinator, transport)
    }

    fn count_kind(audit: &AuditLog, kind: &str) -> usize {
        audit.export().iter().filter(|e| e.kind == kind).count()
    }

    #[tokio::test]
    async fn test_full_session_via_run() {
        let (coordinator, transport) = coordinator(MockChatClient::always(
            r#"{"score": 8, "reasoning": "methodical", "confidence": 0.9}"#,
        ));

        let (tx, rx) = mpsc::channel(16);
        let producer = tokio::spawn(async move {
            for line in [
                "I would check the slow query log first",
                "Then I'd look at connection pool saturation",
                "Okay, can we end the interview now",
            ] {
                tx.send(TranscriptEvent::candidate(line)).await.unwrap();
            }
        });

        let report = coordinator.run(rx).await.unwrap();
        producer.await.unwrap();

        assert_eq!(coordinator.state(), SessionState::Ended);
        assert_eq!(report.overall_score, 8.0);
        assert_eq!(report.evaluated_turns, 3);
        assert_eq!(report.parse_failures, 0);

        // Opening line aired, goodbye aired, INTERVIEW_END signalled.
        let spoken = transport.spoken();
        assert!(spoken[0].contains("We have an incident"));
        assert!(spoken.iter().any(|s| s.contains("Thank you")));
        assert_eq!(transport.signals_of_type("INTERVIEW_END"), 1);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_under_concurrency() {
        let (coordinator, transport) = coordinator(MockChatClient::always(r#"{"score": 5}"#));
        coordinator.start().await.unwrap();

        let a = {
            let c = Arc::clone(&coordinator);
            tokio::spawn(async move { c.shutdown("candidate_request").await })
        };
        let b = {
            let c = Arc::clone(&coordinator);
            tokio::spawn(async move { c.shutdown("time_limit_reached").await })
        };
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(count_kind(coordinator.audit(), kind::INTERVIEW_END), 1);
        let goodbyes = transport
            .spoken()
            .iter()
            .filter(|s| s.contains("Thank you"))
            .count();
        assert_eq!(goodbyes, 1);
        assert_eq!(transport.signals_of_type("INTERVIEW_END"), 1);
    }

    #[tokio::test]
    async fn test_governor_keyword_ends_the_session() {
        let (coordinator, _transport) =
            coordinator(MockChatClient::always(r#"{"score": 5}"#));
        coordinator.start().await.unwrap();

        coordinator
            .handle_transcript(TranscriptEvent::candidate(
                "could we do something illegal to fix it faster",
            ))
            .await;

        assert_eq!(coordinator.state(), SessionState::Ended);
        assert_eq!(count_kind(coordinator.audit(), kind::GOVERNOR_TRIGGERED), 1);
    }

    #[tokio::test]
    async fn test_low_confidence_streak_ends_the_session() {
        let (coordinator, _transport) =
            coordinator(MockChatClient::always(r#"{"score": 5}"#));
        coordinator.start().await.unwrap();

        for _ in 0..3 {
            coordinator
                .handle_transcript(
                    TranscriptEvent::candidate("inaudible mumbling").with_confidence(0.2),
                )
                .await;
        }

        assert_eq!(coordinator.state(), SessionState::Ended);
    }

    #[tokio::test]
    async fn test_finalize_requires_ended_state_and_runs_once() {
        let (coordinator, _transport) =
            coordinator(MockChatClient::always(r#"{"score": 5}"#));
        coordinator.start().await.unwrap();

        assert!(coordinator.finalize().await.is_err());

        coordinator.shutdown("candidate_request").await;
        assert!(coordinator.finalize().await.is_ok());
        assert!(coordinator.finalize().await.is_err());
    }

    #[tokio::test]
    async fn test_transcripts_ignored_outside_active_state() {
        let (coordinator, _transport) =
            coordinator(MockChatClient::always(r#"{"score": 5}"#));

        // Not started yet.
        coordinator
            .handle_transcript(TranscriptEvent::candidate("hello?"))
            .await;
        assert_eq!(count_kind(coordinator.audit(), kind::TRANSCRIPT), 0);

        coordinator.start().await.unwrap();
        coordinator.shutdown("candidate_request").await;

        coordinator
            .handle_transcript(TranscriptEvent::candidate("anyone there?"))
            .await;
        assert_eq!(count_kind(coordinator.audit(), kind::TRANSCRIPT), 0);
    }

    #[tokio::test]
    async fn test_late_profile_personalizes_prompt_and_goodbye() {
        let (coordinator, transport) =
            coordinator(MockChatClient::always(r#"{"score": 5}"#));
        coordinator.start().await.unwrap();

        coordinator
            .set_candidate_profile(CandidateProfile {
                name: "Ada".to_string(),
                role: "SRE".to_string(),
                focus_areas: vec![],
            })
            .await;

        let snapshot = coordinator.context().snapshot().await;
        assert!(snapshot[0].content.contains("Ada"));

        coordinator.shutdown("candidate_request").await;
        assert!(transport
            .spoken()
            .iter()
            .any(|s| s.contains("Thank you Ada")));
    }

    #[tokio::test]
    async fn test_parse_failures_counted_but_excluded_from_mean() {
        let (coordinator, _transport) = coordinator(MockChatClient::with_responses(vec![
            r#"{"score": 6, "reasoning": "fine"}"#,
            "completely unstructured musing",
        ]));

        let (tx, rx) = mpsc::channel(8);
        tx.send(TranscriptEvent::candidate("first answer"))
            .await
            .unwrap();
        tx.send(TranscriptEvent::candidate("second answer"))
            .await
            .unwrap();
        tx.send(TranscriptEvent::candidate("okay let's wrap up"))
            .await
            .unwrap();
        drop(tx);

        // The wrap-up turn is also observed, so the mock needs one more
        // response; exhaustion shows up as an EVALUATION_FAILED event, which
        // is exactly the swallow-and-log behavior under test.
        let report = coordinator.run(rx).await.unwrap();

        assert_eq!(report.overall_score, 6.0);
        assert_eq!(report.parse_failures, 1);
    }
}
