//! The pressure stakeholder.
//!
//! Runs in a loop until cancelled: sleeps a randomized interval and, with
//! some probability, interjects an unhelpful demand for progress.

use std::sync::Arc;
use std::time::Duration;

use crucible_core::audit::{kind, AuditLog};
use crucible_core::config::SessionConfig;
use crucible_core::persona::Persona;
use crucible_core::scenario::fallback_interjections;
use crucible_core::signal::FrontendSignal;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::registry::TaskRegistry;
use crate::transport::{send_signal, RoomTransport};

const ACTOR: &str = "PressureAgent";

/// The anxious stakeholder agent.
pub struct PressureAgent {
    transport: Arc<dyn RoomTransport>,
    audit: Arc<AuditLog>,
    persona_name: String,
    interjections: Vec<String>,
    grace: Duration,
    min_interval: Duration,
    max_interval: Duration,
    probability: f64,
}

impl PressureAgent {
    /// Creates the agent. Uses the persona's interjection bank, falling back
    /// to the built-in lines when the scenario ships none.
    pub fn new(
        transport: Arc<dyn RoomTransport>,
        audit: Arc<AuditLog>,
        persona: &Persona,
        config: &SessionConfig,
    ) -> Self {
        let interjections = if persona.interjections.is_empty() {
            fallback_interjections()
        } else {
            persona.interjections.clone()
        };
        Self {
            transport,
            audit,
            persona_name: persona.name.clone(),
            interjections,
            grace: Duration::from_secs(config.pressure_grace_secs),
            min_interval: Duration::from_secs(config.pressure_min_interval_secs),
            max_interval: Duration::from_secs(config.pressure_max_interval_secs),
            probability: config.pressure_probability.clamp(0.0, 1.0),
        }
    }

    /// Starts the interjection loop on the registry.
    pub fn start(self: &Arc<Self>, registry: &TaskRegistry) {
        let token = registry.child_token();
        let agent = Arc::clone(self);
        registry.spawn("pressure-interjector", async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("pressure loop cancelled");
                }
                _ = agent.run() => {}
            }
        });
        info!(persona = %self.persona_name, "pressure agent started");
    }

    async fn run(&self) {
        tokio::time::sleep(self.grace).await;

        loop {
            let (interval, should_interject, line) = {
                let mut rng = rand::thread_rng();
                let secs = rng.gen_range(self.min_interval.as_secs()..=self.max_interval.as_secs());
                let should = rng.gen_bool(self.probability);
                let line = self.interjections.choose(&mut rng).cloned();
                (Duration::from_secs(secs), should, line)
            };

            tokio::time::sleep(interval).await;

            if !should_interject {
                debug!("pressure wakeup passed without interjection");
                continue;
            }

            let Some(line) = line else { continue };
            self.interject(&line).await;
        }
    }

    async fn interject(&self, line: &str) {
        info!(line, "pressure interjection triggered");
        self.audit
            .log(ACTOR, kind::INTERRUPTION, format!("Triggered: {line}"));

        if let Err(err) = self.transport.say(line).await {
            warn!("pressure interjection failed to air: {}", err);
        }
        send_signal(
            &*self.transport,
            &FrontendSignal::Transcript {
                sender: self.persona_name.clone(),
                text: line.to_string(),
            },
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingTransport;

    fn agent(config: SessionConfig) -> (Arc<PressureAgent>, Arc<RecordingTransport>, Arc<AuditLog>) {
        let transport = Arc::new(RecordingTransport::new());
        let audit = Arc::new(AuditLog::new("s", "c"));
        let persona = Persona::new("Vikram", "VP of Sales");
        let agent = Arc::new(PressureAgent::new(
            transport.clone(),
            audit.clone(),
            &persona,
            &config,
        ));
        (agent, transport, audit)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_interjects_on_every_wakeup_at_probability_one() {
        let config = SessionConfig {
            pressure_grace_secs: 1,
            pressure_min_interval_secs: 10,
            pressure_max_interval_secs: 10,
            pressure_probability: 1.0,
            ..Default::default()
        };
        let (agent, transport, audit) = agent(config);
        let registry = TaskRegistry::new();
        agent.start(&registry);
        settle().await;

        tokio::time::advance(Duration::from_secs(12)).await;
        settle().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;

        let interruptions = audit
            .export()
            .iter()
            .filter(|e| e.kind == kind::INTERRUPTION)
            .count();
        assert_eq!(interruptions, 2);
        assert_eq!(transport.spoken().len(), 2);

        registry.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_interjects_at_probability_zero() {
        let config = SessionConfig {
            pressure_grace_secs: 1,
            pressure_min_interval_secs: 5,
            pressure_max_interval_secs: 5,
            pressure_probability: 0.0,
            ..Default::default()
        };
        let (agent, transport, audit) = agent(config);
        let registry = TaskRegistry::new();
        agent.start(&registry);
        settle().await;

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;

        assert!(audit.export().iter().all(|e| e.kind != kind::INTERRUPTION));
        assert!(transport.spoken().is_empty());

        registry.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_the_loop() {
        let config = SessionConfig {
            pressure_grace_secs: 1,
            pressure_min_interval_secs: 10,
            pressure_max_interval_secs: 10,
            pressure_probability: 1.0,
            ..Default::default()
        };
        let (agent, transport, _audit) = agent(config);
        let registry = TaskRegistry::new();
        agent.start(&registry);

        registry.shutdown(Duration::from_secs(5)).await;
        let before = transport.spoken().len();

        // Time marches on; the cancelled loop stays silent.
        tokio::time::advance(Duration::from_secs(120)).await;
        settle().await;
        assert_eq!(transport.spoken().len(), before);
    }
}
