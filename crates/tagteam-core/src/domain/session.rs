//! Mutable rotation state owned by the orchestrator.

use serde::{Deserialize, Serialize};

/// Per-participant live counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    /// Steps charged to this participant since it last became active.
    pub consecutive_turns: u32,
}

/// Whether a participant currently holds the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantState {
    Active,
    Waiting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminationReason {
    /// The task was marked resolved.
    Resolved { submission: Option<String> },
    /// `global_step_count` reached the step budget.
    StepBudgetExhausted,
    /// The caller stopped the session.
    Cancelled,
    /// A collaborator became unreachable.
    Aborted { reason: String },
}

impl TerminationReason {
    /// Short status string used in summaries.
    pub fn exit_status(&self) -> &'static str {
        match self {
            TerminationReason::Resolved { .. } => "resolved",
            TerminationReason::StepBudgetExhausted => "step_budget_exhausted",
            TerminationReason::Cancelled => "cancelled",
            TerminationReason::Aborted { .. } => "aborted",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::Aborted { reason } => write!(f, "aborted: {reason}"),
            other => f.write_str(other.exit_status()),
        }
    }
}

/// Orchestrator-wide record; the single source of truth for rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Index of the participant holding the turn.
    pub active_index: usize,
    /// Sum of `1 + retry_index` over every recorded step.
    pub global_step_count: u64,
    /// Hard ceiling on `global_step_count`.
    pub step_budget: Option<u64>,
    pub terminated: Option<TerminationReason>,
}

impl SessionState {
    pub fn new(step_budget: Option<u64>) -> Self {
        Self {
            active_index: 0,
            global_step_count: 0,
            step_budget,
            terminated: None,
        }
    }

    pub fn step_budget_remaining(&self) -> Option<u64> {
        self.step_budget
            .map(|budget| budget.saturating_sub(self.global_step_count))
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.is_some()
    }

    pub fn participant_state(&self, index: usize) -> ParticipantState {
        if self.terminated.is_none() && index == self.active_index {
            ParticipantState::Active
        } else {
            ParticipantState::Waiting
        }
    }
}
