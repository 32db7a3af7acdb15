//! External termination signals, polled between iterations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct ControlInner {
    resolved: AtomicBool,
    cancelled: AtomicBool,
    submission: Mutex<Option<String>>,
}

/// Cloneable handle for resolving or cancelling a running session.
///
/// Signals never interrupt a policy or runtime call already in flight; the
/// orchestrator observes them at the top of its next iteration.
#[derive(Debug, Clone, Default)]
pub struct SessionControl {
    inner: Arc<ControlInner>,
}

impl SessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the task resolved.
    pub fn mark_resolved(&self) {
        self.inner.resolved.store(true, Ordering::SeqCst);
    }

    /// Mark the task resolved with a final submission.
    pub fn mark_resolved_with(&self, submission: Option<String>) {
        if submission.is_some() {
            *self
                .inner
                .submission
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = submission;
        }
        self.mark_resolved();
    }

    /// Ask the session to stop.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.resolved.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn submission(&self) -> Option<String> {
        self.inner
            .submission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_signals() {
        let control = SessionControl::new();
        let evaluator = control.clone();
        assert!(!control.is_resolved());

        evaluator.mark_resolved_with(Some("patch".to_string()));
        assert!(control.is_resolved());
        assert_eq!(control.submission().as_deref(), Some("patch"));

        // A later bare resolution keeps the submission.
        evaluator.mark_resolved();
        assert_eq!(control.submission().as_deref(), Some("patch"));
    }
}
