//! Narrow interfaces to the collaborators a session depends on.
//!
//! - [`Policy`] turns a participant's history into a proposed action
//! - [`Runtime`] executes tool calls in a session-scoped environment
//!
//! Both distinguish recoverable failures, which are retried inside a turn,
//! from `Unavailable`, which aborts the session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{FormatError, History, ToolCall, ToolExecutionError};
use crate::scheduling::question::PendingQuestion;

/// A tool call exactly as the policy emitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawToolCall {
    pub name: String,
    /// A JSON object, or a string containing one.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Unparsed policy output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(default)]
    pub thought: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<RawToolCall>,
}

impl RawAction {
    /// Text-only output.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Output carrying one structured tool call.
    pub fn tool(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            tool_calls: vec![RawToolCall {
                name: name.into(),
                arguments,
            }],
            ..Self::default()
        }
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    /// Text used when this output answers a question.
    pub fn answer_text(&self) -> String {
        let content = self.content.trim();
        if !content.is_empty() {
            return content.to_string();
        }
        self.thought
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Output could not be produced in the expected shape; retried.
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("policy unavailable: {0}")]
    Unavailable(String),
}

/// Decision-making collaborator for one participant.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Propose the next action given everything the participant has seen.
    async fn propose(&self, history: &History) -> Result<RawAction, PolicyError>;

    /// Answer a question. `history` already ends with the question entry.
    async fn respond(
        &self,
        history: &History,
        question: &PendingQuestion,
    ) -> Result<RawAction, PolicyError>;
}

/// What the runtime reports for a successful execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub observation: String,
    /// The task is solved; the session ends at the next iteration boundary.
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub submission: Option<String>,
}

impl ExecutionReport {
    pub fn observed(observation: impl Into<String>) -> Self {
        Self {
            observation: observation.into(),
            ..Self::default()
        }
    }

    pub fn resolved(observation: impl Into<String>, submission: Option<String>) -> Self {
        Self {
            observation: observation.into(),
            resolved: true,
            submission,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// The call ran and failed; retried.
    #[error(transparent)]
    Execution(#[from] ToolExecutionError),

    #[error("runtime unavailable: {0}")]
    Unavailable(String),
}

/// Execution collaborator. Stateful across calls within one session.
#[async_trait]
pub trait Runtime: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> Result<ExecutionReport, RuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_text_falls_back_to_thought() {
        let raw = RawAction::text("   ").with_thought(" all green ");
        assert_eq!(raw.answer_text(), "all green");
        assert_eq!(RawAction::text("done").answer_text(), "done");
    }

    #[test]
    fn raw_action_deserializes_with_defaults() {
        let raw: RawAction = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
        assert!(raw.tool_calls.is_empty());
        assert!(raw.thought.is_none());
    }
}
