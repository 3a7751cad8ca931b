//! The interview clock.
//!
//! The single hard deadline in the system: an end-of-session timeout plus an
//! optional earlier warning. The timeout callback drives the coordinator's
//! graceful shutdown, which is idempotent, so a concurrent candidate-initiated
//! shutdown is harmless.

use std::future::Future;
use std::sync::Arc;

use crucible_core::audit::{kind, AuditLog};
use crucible_core::config::SessionConfig;
use tracing::info;

use crate::registry::TaskRegistry;
use crate::timer::{Timer, TimerState};

/// Handle over the warning and timeout timers.
pub struct InterviewClock {
    warning: Option<Timer>,
    timeout: Timer,
}

impl InterviewClock {
    /// Starts the clock on the registry.
    ///
    /// `on_warning` fires at the configured warning offset (skipped when the
    /// offset is not earlier than the deadline); `on_timeout` fires at the
    /// deadline.
    pub fn start<W, WFut, T, TFut>(
        registry: &TaskRegistry,
        audit: Arc<AuditLog>,
        config: &SessionConfig,
        on_warning: W,
        on_timeout: T,
    ) -> Self
    where
        W: FnOnce() -> WFut + Send + 'static,
        WFut: Future<Output = ()> + Send,
        T: FnOnce() -> TFut + Send + 'static,
        TFut: Future<Output = ()> + Send,
    {
        let warning = if config.warning_enabled() {
            let warning_audit = audit.clone();
            Some(Timer::spawn(
                registry,
                audit.clone(),
                "interview-clock-warning",
                config.warning_at(),
                move || async move {
                    warning_audit.log(
                        "System",
                        kind::TIME_WARNING,
                        "Interview time warning reached",
                    );
                    on_warning().await;
                },
            ))
        } else {
            None
        };

        let timeout = Timer::spawn(
            registry,
            audit,
            "interview-clock-timeout",
            config.max_duration(),
            move || async move {
                info!("interview clock expired, triggering timeout");
                on_timeout().await;
            },
        );

        info!(
            max_secs = config.max_duration_secs,
            warning_secs = config.warning_at_secs,
            "interview clock started"
        );

        Self { warning, timeout }
    }

    /// Whether the hard deadline already fired.
    pub fn expired(&self) -> bool {
        self.timeout.state() == TimerState::Fired
    }

    /// State of the warning timer, if one was armed.
    pub fn warning_state(&self) -> Option<TimerState> {
        self.warning.as_ref().map(|t| t.state())
    }
}
