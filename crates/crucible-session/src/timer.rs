//! One-shot session timers.
//!
//! A timer sleeps for its delay and then fires its callback exactly once,
//! unless the owning session is torn down first. Fired and cancelled are
//! terminal; a timer cannot be re-armed, only replaced by a fresh instance.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crucible_core::audit::{kind, AuditLog};

use crate::registry::TaskRegistry;

/// Lifecycle of a one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Sleeping; neither fired nor cancelled yet.
    Pending,
    /// The delay elapsed and the callback ran (or is running).
    Fired,
    /// The session tore down before the delay elapsed; the callback never ran.
    Cancelled,
}

/// A handle observing a spawned one-shot timer.
pub struct Timer {
    label: String,
    state: Arc<Mutex<TimerState>>,
}

impl Timer {
    /// Spawns a one-shot timer on the registry.
    ///
    /// Cancellation is logged to the audit trail distinctly from a normal
    /// firing.
    pub fn spawn<F, Fut>(
        registry: &TaskRegistry,
        audit: Arc<AuditLog>,
        label: impl Into<String>,
        delay: Duration,
        callback: F,
    ) -> Timer
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let label = label.into();
        let state = Arc::new(Mutex::new(TimerState::Pending));

        let token = registry.child_token();
        let task_state = state.clone();
        let task_label = label.clone();
        registry.spawn(label.clone(), async move {
            tokio::select! {
                _ = token.cancelled() => {
                    set_state(&task_state, TimerState::Cancelled);
                    audit.log(
                        "System",
                        kind::TIMER_CANCELLED,
                        format!("{task_label} cancelled before firing"),
                    );
                    tracing::debug!(timer = %task_label, "timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    set_state(&task_state, TimerState::Fired);
                    tracing::debug!(timer = %task_label, "timer fired");
                    callback().await;
                }
            }
        });

        Timer { label, state }
    }

    /// The timer's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current state.
    pub fn state(&self) -> TimerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn set_state(state: &Mutex<TimerState>, next: TimerState) {
    *state.lock().unwrap_or_else(|e| e.into_inner()) = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn settle() {
        // Give spawned tasks a chance to observe advanced time.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once_after_delay() {
        let registry = TaskRegistry::new();
        let audit = Arc::new(AuditLog::new("s", "c"));
        let fired = Arc::new(AtomicUsize::new(0));

        let count = fired.clone();
        let timer = Timer::spawn(
            &registry,
            audit.clone(),
            "test-timer",
            Duration::from_secs(60),
            move || async move {
                count.fetch_add(1, Ordering::SeqCst);
            },
        );

        settle().await;
        assert_eq!(timer.state(), TimerState::Pending);

        tokio::time::advance(Duration::from_secs(61)).await;
        settle().await;

        assert_eq!(timer.state(), TimerState::Fired);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        // A normal firing is not a cancellation.
        assert!(audit
            .export()
            .iter()
            .all(|e| e.kind != kind::TIMER_CANCELLED));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_runs_callback() {
        let registry = TaskRegistry::new();
        let audit = Arc::new(AuditLog::new("s", "c"));
        let fired = Arc::new(AtomicUsize::new(0));

        let count = fired.clone();
        let timer = Timer::spawn(
            &registry,
            audit.clone(),
            "doomed-timer",
            Duration::from_secs(60),
            move || async move {
                count.fetch_add(1, Ordering::SeqCst);
            },
        );

        registry.shutdown(Duration::from_secs(5)).await;

        assert_eq!(timer.state(), TimerState::Cancelled);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        let events = audit.export();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, kind::TIMER_CANCELLED);
        assert!(events[0].details.contains("doomed-timer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_timers_cancel_independently() {
        let registry = TaskRegistry::new();
        let audit = Arc::new(AuditLog::new("s", "c"));

        let short = Timer::spawn(
            &registry,
            audit.clone(),
            "short",
            Duration::from_secs(10),
            || async {},
        );
        let long = Timer::spawn(
            &registry,
            audit.clone(),
            "long",
            Duration::from_secs(1000),
            || async {},
        );

        settle().await;
        tokio::time::advance(Duration::from_secs(11)).await;
        settle().await;

        assert_eq!(short.state(), TimerState::Fired);
        assert_eq!(long.state(), TimerState::Pending);

        registry.shutdown(Duration::from_secs(5)).await;
        assert_eq!(short.state(), TimerState::Fired);
        assert_eq!(long.state(), TimerState::Cancelled);
    }
}
