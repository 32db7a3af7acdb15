//! Global atomic counters for tagteam sessions.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (the orchestrator does so when a session ends).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Relaxed atomic counters shared by every session in the process.
pub struct Metrics {
    steps_recorded: AtomicU64,
    retries_consumed: AtomicU64,
    rotations: AtomicU64,
    handoffs: AtomicU64,
    questions: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            steps_recorded: AtomicU64::new(0),
            retries_consumed: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            handoffs: AtomicU64::new(0),
            questions: AtomicU64::new(0),
        }
    }

    pub fn inc_steps_recorded(&self) {
        self.steps_recorded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "steps_recorded", "counter incremented");
    }

    pub fn inc_retries(&self) {
        self.retries_consumed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "retries_consumed", "counter incremented");
    }

    pub fn inc_rotations(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "rotations", "counter incremented");
    }

    pub fn inc_handoffs(&self) {
        self.handoffs.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "handoffs", "counter incremented");
    }

    pub fn inc_questions(&self) {
        self.questions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "questions", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            steps_recorded = self.steps_recorded(),
            retries_consumed = self.retries_consumed(),
            rotations = self.rotations(),
            handoffs = self.handoffs(),
            questions = self.questions(),
        );
    }

    pub fn steps_recorded(&self) -> u64 {
        self.steps_recorded.load(Ordering::Relaxed)
    }

    pub fn retries_consumed(&self) -> u64 {
        self.retries_consumed.load(Ordering::Relaxed)
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    pub fn handoffs(&self) -> u64 {
        self.handoffs.load(Ordering::Relaxed)
    }

    pub fn questions(&self) -> u64 {
        self.questions.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.steps_recorded.store(0, Ordering::Relaxed);
        self.retries_consumed.store(0, Ordering::Relaxed);
        self.rotations.store(0, Ordering::Relaxed);
        self.handoffs.store(0, Ordering::Relaxed);
        self.questions.store(0, Ordering::Relaxed);
    }
}
