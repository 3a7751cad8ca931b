//! The mole.
//!
//! Waits a randomized delay, then fires at most once: picks a bait line
//! from the fixed bank and records it for scoring. The mole never injects
//! into the conversation itself; delivery is an extension point.

use std::sync::Arc;
use std::time::Duration;

use crucible_core::audit::{kind, AuditLog};
use crucible_core::config::SessionConfig;
use crucible_core::scenario::mole_baits;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::registry::TaskRegistry;
use crate::timer::Timer;

const ACTOR: &str = "MoleAgent";

/// The integrity tester.
pub struct MoleAgent {
    audit: Arc<AuditLog>,
    baits: Vec<String>,
    min_delay: Duration,
    max_delay: Duration,
}

impl MoleAgent {
    /// Creates the agent with the built-in bait bank.
    pub fn new(audit: Arc<AuditLog>, config: &SessionConfig) -> Self {
        Self {
            audit,
            baits: mole_baits(),
            min_delay: Duration::from_secs(config.mole_min_delay_secs),
            max_delay: Duration::from_secs(config.mole_max_delay_secs),
        }
    }

    /// Arms the mole on the registry. Returns the underlying timer handle.
    pub fn start(&self, registry: &TaskRegistry) -> Timer {
        let delay = {
            let mut rng = rand::thread_rng();
            Duration::from_secs(rng.gen_range(self.min_delay.as_secs()..=self.max_delay.as_secs()))
        };

        let audit = self.audit.clone();
        let baits = self.baits.clone();
        info!(?delay, "mole armed");

        Timer::spawn(registry, self.audit.clone(), "mole-bait", delay, move || async move {
            let bait = {
                let mut rng = rand::thread_rng();
                baits.choose(&mut rng).cloned()
            };
            let Some(bait) = bait else { return };

            info!(bait = %bait, "mole triggered");
            audit.log(ACTOR, kind::BAIT_OFFERED, format!("Bait: {bait}"));
        })
    }
}
