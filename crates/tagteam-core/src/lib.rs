//! tagteam core library
//!
//! Several agents take turns on one task. Each holds the turn for a bounded
//! number of consecutive steps, can hand it off early, can ask a teammate a
//! question without giving it up, and pays for self-corrections out of its
//! own turn budget.

pub mod collaborators;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod ledger_recorder;
pub mod metrics;
pub mod obs;
pub mod runtime;
pub mod scheduling;
pub mod scripted;
pub mod telemetry;
pub mod trajectory;

pub use collaborators::{
    ExecutionReport, Policy, PolicyError, RawAction, RawToolCall, Runtime, RuntimeError,
};
pub use config::{AgentConfig, ConfigError, TeamConfig};
pub use domain::{
    Action, FailedAttempt, FormatError, History, HistoryEntry, MirroredStep, NoTargetAgentError,
    Outcome, Participant, ParticipantState, Result, SessionAborted, SessionState, Step,
    StepErrorKind, TeamError, TerminationReason, ToolCall, ToolExecutionError, TurnState,
};
pub use fakes::ScriptedRuntime;
pub use ledger_recorder::LedgerRecorder;
pub use runtime::ProcessRuntime;
pub use scheduling::{
    AgentAdapter, ControlSignal, PendingQuestion, SessionControl, SessionObserver, SessionReport,
    SessionStarted, TeamOrchestrator,
};
pub use scripted::{PolicyScript, ScriptedPolicy};
pub use telemetry::init_tracing;
pub use trajectory::{
    read_trajectory_artifact, read_trajectory_file, write_trajectory_artifact, TrajectoryArtifact,
};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
