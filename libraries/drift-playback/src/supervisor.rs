//! Single-slot background task supervision
//!
//! Each background concern (queue prefetch, radio fetch) owns one `TaskSlot`.
//! A slot holds at most one task. Tasks receive a token when spawned and hand
//! it back with their result; the owner calls [`TaskSlot::finish`] to accept
//! the result, which fails for tokens of cancelled or replaced tasks.

use std::future::Future;
use tokio::task::JoinHandle;
use tracing::debug;

struct ActiveTask {
    token: u64,
    handle: JoinHandle<()>,
}

/// Supervisor holding at most one background task
pub struct TaskSlot {
    label: &'static str,
    next_token: u64,
    active: Option<ActiveTask>,
}

impl TaskSlot {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            next_token: 1,
            active: None,
        }
    }

    /// Whether a task is in flight (spawned and not yet finished)
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Spawn a task unless one is already in flight
    ///
    /// Returns the new task's token, or `None` when the request was dropped.
    pub fn try_start<F, Fut>(&mut self, spawn: F) -> Option<u64>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Some(active) = &self.active {
            debug!(slot = self.label, token = active.token, "task in flight, dropping request");
            return None;
        }
        Some(self.spawn(spawn))
    }

    /// Spawn a task, aborting the one in flight
    pub fn replace<F, Fut>(&mut self, spawn: F) -> u64
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.spawn(spawn)
    }

    /// Accept the result of the task holding `token`
    ///
    /// Returns `false` for stale tokens; their results must be discarded.
    pub fn finish(&mut self, token: u64) -> bool {
        match &self.active {
            Some(active) if active.token == token => {
                self.active = None;
                true
            }
            _ => {
                debug!(slot = self.label, token, "discarding result of superseded task");
                false
            }
        }
    }

    /// Abort the task in flight, if any
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(slot = self.label, token = active.token, "cancelling task");
            active.handle.abort();
        }
    }

    fn spawn<F, Fut>(&mut self, spawn: F) -> u64
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.next_token;
        self.next_token += 1;
        let handle = tokio::spawn(spawn(token));
        self.active = Some(ActiveTask { token, handle });
        token
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.handle.abort();
        }
    }
}
