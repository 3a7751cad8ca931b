//! The crisis popup agent.
//!
//! Fires twice on a two-stage schedule: a short delay from session start,
//! then a longer delay measured from the first firing. Each firing generates
//! fresh crisis content (static bank fallback), interrupts the shared
//! conversation and signals the frontend.

use std::sync::Arc;
use std::time::Duration;

use crucible_core::audit::{kind, AuditLog};
use crucible_core::config::SessionConfig;
use crucible_core::conversation::{ChatMessage, ConversationContext};
use crucible_core::persona::CandidateProfile;
use crucible_core::scenario::fallback_crises;
use crucible_core::signal::FrontendSignal;
use crucible_interaction::{prompt, ChatClient, ChatRequest};
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::registry::TaskRegistry;
use crate::transport::{send_signal, RoomTransport};

const ACTOR: &str = "CrisisPopupAgent";

/// Background agent that injects surprise crises.
pub struct CrisisPopupAgent {
    chat: Arc<dyn ChatClient>,
    transport: Arc<dyn RoomTransport>,
    context: Arc<ConversationContext>,
    audit: Arc<AuditLog>,
    domain: String,
    candidate: CandidateProfile,
    first_delay: Duration,
    second_delay: Duration,
}

impl CrisisPopupAgent {
    /// Creates the agent from session wiring.
    pub fn new(
        chat: Arc<dyn ChatClient>,
        transport: Arc<dyn RoomTransport>,
        context: Arc<ConversationContext>,
        audit: Arc<AuditLog>,
        domain: impl Into<String>,
        candidate: CandidateProfile,
        config: &SessionConfig,
    ) -> Self {
        Self {
            chat,
            transport,
            context,
            audit,
            domain: domain.into(),
            candidate,
            first_delay: Duration::from_secs(config.crisis_first_delay_secs),
            second_delay: Duration::from_secs(config.crisis_second_delay_secs),
        }
    }

    /// Starts the two-stage crisis schedule on the registry.
    pub fn start(self: &Arc<Self>, registry: &TaskRegistry) {
        let token = registry.child_token();
        let agent = Arc::clone(self);
        registry.spawn("crisis-popup", async move {
            tokio::select! {
                _ = token.cancelled() => {
                    agent.audit.log("System", kind::TIMER_CANCELLED, "crisis-popup cancelled");
                }
                _ = agent.run() => {}
            }
        });
    }

    async fn run(&self) {
        info!(delay = ?self.first_delay, "crisis stage 1 armed");
        tokio::time::sleep(self.first_delay).await;
        self.trigger(1).await;

        // The second stage is measured from the first firing, not from
        // session start.
        info!(delay = ?self.second_delay, "crisis stage 2 armed");
        tokio::time::sleep(self.second_delay).await;
        self.trigger(2).await;
    }

    async fn trigger(&self, stage: u8) {
        let question = self.generate_question().await;

        self.audit.log_with_metadata(
            ACTOR,
            kind::CRISIS_TRIGGERED,
            format!("Stage {stage} crisis in domain '{}'", self.domain),
            serde_json::json!({"question": question, "stage": stage}),
        );

        // High-priority interruption for the lead persona.
        self.context
            .append(ChatMessage::system(format!(
                "ESCALATION: a sudden crisis has occurred. Interrupt the current \
                 topic and urgently ask this: '{question}' Speak with urgency; \
                 this is a surprise test."
            )))
            .await;

        send_signal(&*self.transport, &FrontendSignal::crisis_popup(&question)).await;
        send_signal(
            &*self.transport,
            &FrontendSignal::Transcript {
                sender: "SYSTEM".to_string(),
                text: format!("[CRISIS ALERT] {question}"),
            },
        )
        .await;

        info!(stage, "crisis delivered");
    }

    /// Generates crisis content, falling back to the static bank when the
    /// backend fails or returns nothing.
    async fn generate_question(&self) -> String {
        let generated = match prompt::crisis_generation(&self.domain, &self.candidate) {
            Ok(system) => {
                let request = ChatRequest::one_shot(system, "Generate the crisis now.")
                    .with_temperature(0.9);
                match self.chat.chat(request).await {
                    Ok(response) => Some(response.content),
                    Err(err) => {
                        warn!("crisis generation failed, using fallback bank: {}", err);
                        None
                    }
                }
            }
            Err(err) => {
                warn!("crisis prompt render failed, using fallback bank: {}", err);
                None
            }
        };

        match generated.filter(|text| !text.trim().is_empty()) {
            Some(text) => text,
            None => {
                let bank = fallback_crises();
                let entry = {
                    let mut rng = rand::thread_rng();
                    bank.choose(&mut rng).cloned()
                };
                match entry {
                    Some(entry) => format!("ALERT: {} {}", entry.symptom, entry.inject),
                    None => "ALERT: production is degrading rapidly. Walk me through your next move.".to_string(),
                }
            }
        }
    }
}
