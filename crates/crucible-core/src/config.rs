//! Session configuration.
//!
//! Every timing, threshold and keyword the coordinator and its background
//! agents consult lives here, so a whole session is tunable from one TOML
//! table. `Default` encodes the canonical production values.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for one interview session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Hard interview deadline in seconds (default 40 minutes).
    pub max_duration_secs: u64,
    /// When the time warning fires, in seconds from start (default 35 minutes).
    pub warning_at_secs: u64,
    /// Delay before the first crisis fires, in seconds.
    pub crisis_first_delay_secs: u64,
    /// Delay between the first and second crisis firings, in seconds.
    pub crisis_second_delay_secs: u64,
    /// Grace period before the pressure loop starts, in seconds.
    pub pressure_grace_secs: u64,
    /// Lower bound of the randomized pressure interval, in seconds.
    pub pressure_min_interval_secs: u64,
    /// Upper bound of the randomized pressure interval, in seconds.
    pub pressure_max_interval_secs: u64,
    /// Probability that a pressure wakeup actually interjects.
    pub pressure_probability: f64,
    /// Lower bound of the mole's randomized delay, in seconds.
    pub mole_min_delay_secs: u64,
    /// Upper bound of the mole's randomized delay, in seconds.
    pub mole_max_delay_secs: u64,
    /// Keywords that trip the governor immediately.
    pub governor_keywords: Vec<String>,
    /// Observer confidence below this counts toward the low-confidence streak.
    pub governor_confidence_threshold: f64,
    /// Consecutive low-confidence turns that trip the governor.
    pub governor_streak_limit: usize,
    /// Overall score (0-10 scale) at or above which the decision is Advance.
    pub decision_cutoff: f64,
    /// Bound on how long teardown waits for the goodbye line to air, in seconds.
    pub goodbye_timeout_secs: u64,
    /// Bound on how long shutdown waits for background tasks to unwind, in seconds.
    pub task_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 2400,
            warning_at_secs: 2100,
            crisis_first_delay_secs: 180,
            crisis_second_delay_secs: 300,
            pressure_grace_secs: 20,
            pressure_min_interval_secs: 15,
            pressure_max_interval_secs: 40,
            pressure_probability: 0.5,
            mole_min_delay_secs: 30,
            mole_max_delay_secs: 60,
            governor_keywords: ["suicide", "bomb", "kill", "illegal"]
                .into_iter()
                .map(String::from)
                .collect(),
            governor_confidence_threshold: 0.4,
            governor_streak_limit: 3,
            decision_cutoff: 7.0,
            goodbye_timeout_secs: 10,
            task_grace_secs: 5,
        }
    }
}

impl SessionConfig {
    /// Hard interview deadline as a `Duration`.
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }

    /// Warning offset as a `Duration`.
    pub fn warning_at(&self) -> Duration {
        Duration::from_secs(self.warning_at_secs)
    }

    /// Whether the warning sub-timer should run at all.
    pub fn warning_enabled(&self) -> bool {
        self.warning_at_secs < self.max_duration_secs
    }
}
