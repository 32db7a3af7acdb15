//! Per-participant wrapper that drives the retry loop around one policy.

use std::sync::Arc;

use tracing::debug;

use crate::collaborators::{Policy, PolicyError, Runtime, RuntimeError};
use crate::domain::{
    Action, FailedAttempt, History, HistoryEntry, Outcome, Participant, SessionAborted, Step,
    StepDraft, StepErrorKind,
};
use crate::metrics::METRICS;
use crate::obs;

use super::question::PendingQuestion;
use super::signal::{parse_raw_action, surrounding_prose};

/// The runtime reported the task solved during a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub submission: Option<String>,
}

/// Result of one `take_turn`.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    pub draft: StepDraft,
    /// Retry entries written to the history during this turn.
    pub retries_used: u32,
    pub resolution: Option<Resolution>,
}

enum Attempt {
    Succeeded {
        thought: Option<String>,
        action: Action,
        outcome: Outcome,
        resolution: Option<Resolution>,
    },
    Failed(FailedAttempt),
}

pub struct AgentAdapter {
    participant: Participant,
    policy: Arc<dyn Policy>,
    history: History,
}

impl AgentAdapter {
    pub fn new(participant: Participant, policy: Arc<dyn Policy>) -> Self {
        let history = History::new(participant.name.clone());
        Self {
            participant,
            policy,
            history,
        }
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn name(&self) -> &str {
        &self.participant.name
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub(crate) fn into_history(self) -> History {
        self.history
    }

    /// Append an entry on the orchestrator's behalf.
    pub(crate) fn accept(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    pub(crate) fn record(&mut self, step: Step) {
        self.history.push(HistoryEntry::Step(step));
    }

    /// Produce exactly one step, retrying failed attempts up to `retry_cap`.
    ///
    /// Every failed attempt is written to the history as a retry entry before
    /// the policy is asked again. When the cap is reached the last failure
    /// becomes the step's outcome. A cap of 0 behaves like 1.
    pub async fn take_turn(
        &mut self,
        runtime: &dyn Runtime,
        retry_cap: u32,
    ) -> Result<TurnResult, SessionAborted> {
        let mut retries = 0u32;
        loop {
            match self.attempt(runtime, retries + 1).await? {
                Attempt::Succeeded {
                    thought,
                    action,
                    outcome,
                    resolution,
                } => {
                    return Ok(TurnResult {
                        draft: StepDraft {
                            author: self.participant.name.clone(),
                            thought,
                            action,
                            outcome,
                            retry_index: retries,
                            retry_budget_exhausted: false,
                        },
                        retries_used: retries,
                        resolution,
                    });
                }
                Attempt::Failed(failed) => {
                    obs::emit_retry(
                        &self.participant.name,
                        failed.attempt,
                        failed.error,
                        &failed.detail,
                    );
                    METRICS.inc_retries();
                    self.history.push(HistoryEntry::Retry(failed.clone()));
                    retries += 1;
                    if retries < retry_cap {
                        continue;
                    }
                    debug!(
                        agent = %self.participant.name,
                        retries,
                        retry_cap,
                        "retry budget exhausted, finalizing last failure"
                    );
                    return Ok(TurnResult {
                        draft: StepDraft {
                            author: self.participant.name.clone(),
                            thought: failed.thought,
                            action: failed.action,
                            outcome: Outcome::Error {
                                kind: failed.error,
                                detail: failed.detail,
                            },
                            retry_index: retries,
                            retry_budget_exhausted: true,
                        },
                        retries_used: retries,
                        resolution: None,
                    });
                }
            }
        }
    }

    async fn attempt(&self, runtime: &dyn Runtime, attempt: u32) -> Result<Attempt, SessionAborted> {
        let raw = match self.policy.propose(&self.history).await {
            Ok(raw) => raw,
            Err(PolicyError::Format(e)) => {
                return Ok(Attempt::Failed(FailedAttempt {
                    attempt,
                    thought: None,
                    action: Action::Malformed { raw: String::new() },
                    error: StepErrorKind::Format,
                    detail: e.detail,
                }))
            }
            Err(PolicyError::Unavailable(reason)) => {
                return Err(SessionAborted {
                    reason: format!("policy for {} unavailable: {reason}", self.participant.name),
                })
            }
        };

        let action = match parse_raw_action(&raw) {
            Ok(action) => action,
            Err(e) => {
                return Ok(Attempt::Failed(FailedAttempt {
                    attempt,
                    thought: raw.thought,
                    action: Action::Malformed { raw: raw.content },
                    error: StepErrorKind::Format,
                    detail: e.detail,
                }))
            }
        };

        let thought = raw.thought.clone().or_else(|| surrounding_prose(&raw));
        let (outcome, resolution) = match self.settle(runtime, &action).await? {
            Ok(settled) => settled,
            Err(detail) => {
                return Ok(Attempt::Failed(FailedAttempt {
                    attempt,
                    thought,
                    action,
                    error: StepErrorKind::ToolExecution,
                    detail,
                }))
            }
        };

        Ok(Attempt::Succeeded {
            thought,
            action,
            outcome,
            resolution,
        })
    }

    /// Outcome of a parsed action. The inner `Err` is a recoverable
    /// execution failure.
    async fn settle(
        &self,
        runtime: &dyn Runtime,
        action: &Action,
    ) -> Result<Result<(Outcome, Option<Resolution>), String>, SessionAborted> {
        let settled = match action {
            Action::Handoff { .. } if !self.participant.handoff_enabled => (
                Outcome::success("handoff is disabled for this agent; continue working"),
                None,
            ),
            Action::Handoff { .. } => (Outcome::success("turn handed off"), None),
            Action::Question { .. } => (Outcome::success("question sent"), None),
            Action::Malformed { .. } => (Outcome::success(""), None),
            Action::ToolCall(call) => match runtime.execute(call).await {
                Ok(report) => {
                    let resolution = report.resolved.then_some(Resolution {
                        submission: report.submission,
                    });
                    (Outcome::success(report.observation), resolution)
                }
                Err(RuntimeError::Execution(e)) => return Ok(Err(e.to_string())),
                Err(RuntimeError::Unavailable(reason)) => {
                    return Err(SessionAborted {
                        reason: format!("runtime unavailable: {reason}"),
                    })
                }
            },
        };
        Ok(Ok(settled))
    }

    /// Answer a question once, without touching turn accounting.
    ///
    /// The question is shown to the policy as an ephemeral entry and is not
    /// kept in this participant's history.
    pub async fn answer(&self, question: &PendingQuestion) -> Result<String, SessionAborted> {
        let view = self.history.with_ephemeral(HistoryEntry::Question {
            from: question.asker.clone(),
            text: question.text.clone(),
        });
        match self.policy.respond(&view, question).await {
            Ok(raw) => {
                let text = raw.answer_text();
                if text.is_empty() {
                    Ok("<no answer>".to_string())
                } else {
                    Ok(text)
                }
            }
            Err(PolicyError::Format(e)) => Ok(format!("<no answer: {}>", e.detail)),
            Err(PolicyError::Unavailable(reason)) => Err(SessionAborted {
                reason: format!("policy for {} unavailable: {reason}", self.participant.name),
            }),
        }
    }
}

impl std::fmt::Debug for AgentAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentAdapter")
            .field("participant", &self.participant)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}
