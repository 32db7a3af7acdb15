//! Deterministic policy that replays queued outputs.
//!
//! Used by tests and by the CLI, which loads a [`PolicyScript`] from JSON:
//!
//! ```json
//! {
//!   "agents": {
//!     "driver": {
//!       "actions": [
//!         { "content": "```\nls\n```" },
//!         { "format_error": "model returned nothing" },
//!         { "tool_calls": [{ "name": "handoff", "arguments": { "message": "over to you" } }] }
//!       ],
//!       "answers": [{ "content": "tests pass" }]
//!     }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborators::{Policy, PolicyError, RawAction};
use crate::domain::{FormatError, History, Result};
use crate::scheduling::question::PendingQuestion;

#[derive(Debug, Default)]
struct ScriptState {
    actions: VecDeque<std::result::Result<RawAction, PolicyError>>,
    answers: VecDeque<std::result::Result<RawAction, PolicyError>>,
    seen_histories: Vec<History>,
    answer_histories: Vec<History>,
    questions: Vec<PendingQuestion>,
}

/// Policy that pops one queued result per call.
///
/// Once a queue runs dry the policy reports itself unavailable, which ends
/// the session.
#[derive(Debug, Default)]
pub struct ScriptedPolicy {
    state: Mutex<ScriptState>,
}

impl ScriptedPolicy {
    pub fn new(actions: Vec<std::result::Result<RawAction, PolicyError>>) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                actions: actions.into(),
                ..ScriptState::default()
            }),
        }
    }

    pub fn with_answers(self, answers: Vec<std::result::Result<RawAction, PolicyError>>) -> Self {
        self.lock().answers = answers.into();
        self
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Histories passed to `propose`, in call order.
    pub fn seen_histories(&self) -> Vec<History> {
        self.lock().seen_histories.clone()
    }

    /// Histories passed to `respond`, in call order.
    pub fn answer_histories(&self) -> Vec<History> {
        self.lock().answer_histories.clone()
    }

    /// Questions passed to `respond`, in call order.
    pub fn questions(&self) -> Vec<PendingQuestion> {
        self.lock().questions.clone()
    }

    pub fn remaining_actions(&self) -> usize {
        self.lock().actions.len()
    }
}

#[async_trait]
impl Policy for ScriptedPolicy {
    async fn propose(&self, history: &History) -> std::result::Result<RawAction, PolicyError> {
        let mut state = self.lock();
        state.seen_histories.push(history.clone());
        state.actions.pop_front().unwrap_or_else(|| {
            Err(PolicyError::Unavailable(format!(
                "script for {} is exhausted",
                history.owner()
            )))
        })
    }

    async fn respond(
        &self,
        history: &History,
        question: &PendingQuestion,
    ) -> std::result::Result<RawAction, PolicyError> {
        let mut state = self.lock();
        state.answer_histories.push(history.clone());
        state.questions.push(question.clone());
        state.answers.pop_front().unwrap_or_else(|| {
            Err(PolicyError::Unavailable(format!(
                "no scripted answers left for {}",
                history.owner()
            )))
        })
    }
}

/// One scripted policy output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptedTurn {
    /// The policy fails to produce parseable output.
    Fail { format_error: String },
    Act(RawAction),
}

impl From<ScriptedTurn> for std::result::Result<RawAction, PolicyError> {
    fn from(turn: ScriptedTurn) -> Self {
        match turn {
            ScriptedTurn::Fail { format_error } => {
                Err(PolicyError::Format(FormatError::new(format_error)))
            }
            ScriptedTurn::Act(raw) => Ok(raw),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentScript {
    #[serde(default)]
    pub actions: Vec<ScriptedTurn>,
    #[serde(default)]
    pub answers: Vec<ScriptedTurn>,
}

/// Scripts for a whole team, keyed by agent name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyScript {
    pub agents: BTreeMap<String, AgentScript>,
}

impl PolicyScript {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Build the policy for `agent`. Agents without a script get an empty one.
    pub fn policy_for(&self, agent: &str) -> ScriptedPolicy {
        let script = self.agents.get(agent).cloned().unwrap_or_default();
        ScriptedPolicy::new(script.actions.into_iter().map(Into::into).collect())
            .with_answers(script.answers.into_iter().map(Into::into).collect())
    }
}
