//! Structured observability hooks for tagteam session lifecycle events.
//!
//! This module provides:
//! - Session-scoped tracing spans via `session_span` and the `SessionSpan` RAII guard
//! - Emission functions for key lifecycle events: start, step, retry, rotation,
//!   handoff, question, finish
//!
//! Events are emitted at `info!` level; retries and observer failures at `warn!`.
//! Filter with `RUST_LOG`, switch to JSON with the CLI `--json` flag.

use tracing::{info, warn};

use crate::domain::{StepErrorKind, TerminationReason};

/// Span carrying the session id; attach to futures with `Instrument`.
pub fn session_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("tagteam.session", session_id = %session_id)
}

/// RAII guard that enters a session-scoped span for synchronous code.
///
/// # Example
///
/// ```ignore
/// let _span = SessionSpan::enter("0b9c…");
/// // every event below carries session_id
/// ```
pub struct SessionSpan {
    _span: tracing::span::EnteredSpan,
}

impl SessionSpan {
    /// Create and enter a span tagged with the session id.
    pub fn enter(session_id: &str) -> Self {
        Self {
            _span: session_span(session_id).entered(),
        }
    }
}

/// Emit event: session started.
pub fn emit_session_started(session_id: &str, team_name: &str, participants: usize) {
    info!(
        event = "session.started",
        session_id = %session_id,
        team = %team_name,
        participants = participants,
    );
}

/// Emit event: a step was recorded and mirrored.
pub fn emit_step_recorded(session_id: &str, author: &str, seq: u64, kind: &str, retries: u32) {
    info!(
        event = "step.recorded",
        session_id = %session_id,
        agent = %author,
        seq = seq,
        kind = %kind,
        retries = retries,
    );
}

/// Emit event: an attempt failed and was written back as a retry entry.
pub fn emit_retry(agent: &str, attempt: u32, kind: StepErrorKind, detail: &str) {
    warn!(
        event = "step.retry",
        agent = %agent,
        attempt = attempt,
        kind = %kind,
        detail = %detail,
    );
}

/// Emit event: the turn moved to another participant.
pub fn emit_rotation(from: &str, to: &str, forced: bool) {
    info!(event = "turn.rotated", from = %from, to = %to, forced = forced);
}

pub fn emit_handoff(agent: &str, message: Option<&str>) {
    info!(
        event = "turn.handoff",
        agent = %agent,
        has_message = message.is_some(),
    );
}

pub fn emit_question_asked(asker: &str, target: &str) {
    info!(event = "question.asked", asker = %asker, target = %target);
}

pub fn emit_question_answered(asker: &str, target: &str, answer_chars: usize) {
    info!(
        event = "question.answered",
        asker = %asker,
        target = %target,
        answer_chars = answer_chars,
    );
}

/// Emit event: session finished with duration, step count and exit status.
pub fn emit_session_finished(
    session_id: &str,
    duration_ms: u64,
    total_steps: u64,
    termination: &TerminationReason,
) {
    info!(
        event = "session.finished",
        session_id = %session_id,
        duration_ms = duration_ms,
        total_steps = total_steps,
        exit_status = %termination,
    );
}

/// Emit event: an observer hook returned an error (warning level).
pub fn emit_observer_error(hook: &str, error: &dyn std::fmt::Display) {
    warn!(event = "observer.error", hook = %hook, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_span_create() {
        let _span = SessionSpan::enter("test-session-id");
        emit_rotation("driver", "navigator", false);
    }
}
