//! A single-shot event primitive shared by the manager's lifecycle flags
//! and by each task's `done` signal.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// An event that can be set at most once and awaited any number of times.
///
/// Once `set`, every call to `wait` (in flight or future) resolves immediately.
#[derive(Debug, Default)]
pub(crate) struct OnceEvent {
    set: AtomicBool,
    notify: Notify,
}

impl OnceEvent {
    pub(crate) fn new() -> Self {
        Self {
            set: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Set the event. Idempotent: the second and later calls are no-ops.
    pub(crate) fn set(&self) {
        if !self.set.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub(crate) fn is_set(&self) -> bool {
        self.set.load(Ordering::SeqCst)
    }

    /// Wait until the event is set. Returns immediately if already set.
    pub(crate) async fn wait(&self) {
        loop {
            if self.is_set() {
                return;
            }
            // Register interest before re-checking so a `set()` racing with
            // this call can't be missed between the check and the await.
            let notified = self.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
