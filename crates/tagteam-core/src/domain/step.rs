//! Steps: the unit of work a participant produces in one turn.

use serde::{Deserialize, Serialize};

/// A tool invocation as understood by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Shell command carried by the call, if any.
    pub fn command(&self) -> Option<&str> {
        self.arguments.get("command").and_then(|v| v.as_str())
    }

    /// Look up a string argument.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// Tagged action carried by a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    ToolCall(ToolCall),
    Handoff {
        message: Option<String>,
    },
    Question {
        text: String,
        target: Option<String>,
    },
    /// Output that never parsed into one of the above.
    Malformed {
        raw: String,
    },
}

impl Action {
    /// Stable lowercase name used in logs and ledger entries.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::ToolCall(_) => "tool_call",
            Action::Handoff { .. } => "handoff",
            Action::Question { .. } => "question",
            Action::Malformed { .. } => "malformed",
        }
    }
}

/// Why a step or attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    Format,
    ToolExecution,
}

impl std::fmt::Display for StepErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepErrorKind::Format => "format",
            StepErrorKind::ToolExecution => "tool_execution",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { observation: String },
    Error { kind: StepErrorKind, detail: String },
}

impl Outcome {
    pub fn success(observation: impl Into<String>) -> Self {
        Outcome::Success {
            observation: observation.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Text shown to whoever reads the outcome.
    pub fn observation(&self) -> String {
        match self {
            Outcome::Success { observation } => observation.clone(),
            Outcome::Error { kind, detail } => format!("[{kind} error] {detail}"),
        }
    }
}

/// A recorded step. Immutable once the orchestrator assigns its sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub author: String,
    /// Global step count after this step was accounted for.
    pub sequence: u64,
    /// Free-form rationale that accompanied the action.
    pub thought: Option<String>,
    pub action: Action,
    pub outcome: Outcome,
    /// Retries consumed before this step was finalized.
    pub retry_index: u32,
    /// The retry cap was hit and `outcome` is the last failure.
    pub retry_budget_exhausted: bool,
}

/// A step produced by an adapter that has not been sequenced yet.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDraft {
    pub author: String,
    pub thought: Option<String>,
    pub action: Action,
    pub outcome: Outcome,
    pub retry_index: u32,
    pub retry_budget_exhausted: bool,
}

impl StepDraft {
    pub fn finalize(self, sequence: u64) -> Step {
        Step {
            author: self.author,
            sequence,
            thought: self.thought,
            action: self.action,
            outcome: self.outcome,
            retry_index: self.retry_index,
            retry_budget_exhausted: self.retry_budget_exhausted,
        }
    }
}

/// One failed attempt inside a turn, kept as a retry entry in the
/// author's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAttempt {
    /// 1-based attempt number within the turn.
    pub attempt: u32,
    pub thought: Option<String>,
    pub action: Action,
    pub error: StepErrorKind,
    pub detail: String,
}
