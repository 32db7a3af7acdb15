//! Domain models for tagteam.
//!
//! Canonical definitions for the core entities:
//! - `Participant`: identity and static per-agent configuration
//! - `Step`: one recorded unit of work and its outcome
//! - `History`: a participant's append-only view of the session
//! - `SessionState` / `TurnState`: rotation bookkeeping

pub mod error;
pub mod history;
pub mod participant;
pub mod session;
pub mod step;

pub use error::{
    FormatError, NoTargetAgentError, Result, SessionAborted, TeamError, ToolExecutionError,
};
pub use history::{History, HistoryEntry, MirroredStep};
pub use participant::Participant;
pub use session::{ParticipantState, SessionState, TerminationReason, TurnState};
pub use step::{Action, FailedAttempt, Outcome, Step, StepDraft, StepErrorKind, ToolCall};
