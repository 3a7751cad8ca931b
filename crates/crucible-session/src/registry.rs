//! Task registry.
//!
//! Every background task a session spawns is tracked here, so shutdown can
//! cancel all of them cooperatively and wait for them to unwind before the
//! report is generated. Nothing in the session spawns fire-and-forget tasks
//! from inside business logic.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Tracks spawned tasks and owns the session's cancellation token tree.
pub struct TaskRegistry {
    cancel: CancellationToken,
    handles: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Returns a child token linked to the registry's root token.
    ///
    /// Background tasks select against their child token so cancelling the
    /// registry unwinds all of them without affecting unrelated sessions.
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Whether shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Spawns and tracks a background task.
    pub fn spawn<F>(&self, label: impl Into<String>, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let label = label.into();
        debug!(task = %label, "spawning session task");
        let handle = tokio::spawn(future);
        self.lock().push((label, handle));
    }

    /// Number of tasks still tracked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no tasks are tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Cancels every tracked task and waits for each to unwind.
    ///
    /// Tasks that ignore the cancel signal past the grace period are
    /// aborted. Safe to call more than once; later calls only drain tasks
    /// spawned in between.
    pub async fn shutdown(&self, grace: Duration) {
        self.cancel.cancel();

        let handles: Vec<(String, JoinHandle<()>)> = self.lock().drain(..).collect();
        for (label, mut handle) in handles {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => debug!(task = %label, "session task unwound"),
                Ok(Err(err)) => warn!(task = %label, error = %err, "session task failed"),
                Err(_) => {
                    warn!(task = %label, "session task ignored cancel, aborting");
                    handle.abort();
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, JoinHandle<()>)>> {
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_tracked_tasks() {
        let registry = TaskRegistry::new();
        let finished = Arc::new(AtomicBool::new(false));

        let token = registry.child_token();
        let flag = finished.clone();
        registry.spawn("sleeper", async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(3600)) => {
                    flag.store(true, Ordering::SeqCst);
                }
            }
        });

        registry.shutdown(Duration::from_secs(5)).await;

        assert!(!finished.load(Ordering::SeqCst));
        assert!(registry.is_cancelled());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelling_one_child_does_not_affect_others() {
        let registry = TaskRegistry::new();
        let first = registry.child_token();
        let second = registry.child_token();

        first.cancel();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!registry.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_cooperative_unwind() {
        let registry = TaskRegistry::new();
        let unwound = Arc::new(AtomicBool::new(false));

        let token = registry.child_token();
        let flag = unwound.clone();
        registry.spawn("cooperative", async move {
            token.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });

        registry.shutdown(Duration::from_secs(5)).await;
        assert!(unwound.load(Ordering::SeqCst));
    }
}
