//! The team state machine.
//!
//! Each iteration: check termination, allocate a retry cap, let the active
//! participant take one turn, account for it, mirror it to everyone else,
//! then either answer a question (no rotation) or apply rotation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{warn, Instrument};

use crate::collaborators::Runtime;
use crate::domain::{
    History, HistoryEntry, Result, SessionAborted, SessionState, Step, TeamError,
    TerminationReason, TurnState,
};
use crate::metrics::METRICS;
use crate::obs;

use super::adapter::AgentAdapter;
use super::allocator::allocate;
use super::control::SessionControl;
use super::mirror::propagate;
use super::observer::{ObserverSet, SessionObserver, SessionStarted};
use super::question::{resolve_target, PendingQuestion};
use super::signal::{classify_for, ControlSignal};

/// Everything a finished session produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub team_name: String,
    pub termination: TerminationReason,
    pub state: SessionState,
    /// Final submission, when the task was resolved with one.
    pub submission: Option<String>,
    /// Every recorded step in sequence order.
    pub trajectory: Vec<Step>,
    /// Each participant's history, in rotation order.
    pub histories: Vec<History>,
    pub duration_ms: u64,
}

impl SessionReport {
    pub fn exit_status(&self) -> &'static str {
        self.termination.exit_status()
    }

    pub fn history_of(&self, name: &str) -> Option<&History> {
        self.histories.iter().find(|h| h.owner() == name)
    }
}

pub struct TeamOrchestrator {
    session_id: String,
    team_name: String,
    adapters: Vec<AgentAdapter>,
    turns: Vec<TurnState>,
    runtime: Arc<dyn Runtime>,
    control: SessionControl,
    observers: ObserverSet,
    trajectory: Vec<Step>,
}

impl TeamOrchestrator {
    /// Build an orchestrator over participants in rotation order.
    ///
    /// Fails on an empty team, duplicate names or a zero turn budget.
    pub fn new(
        team_name: impl Into<String>,
        adapters: Vec<AgentAdapter>,
        runtime: Arc<dyn Runtime>,
    ) -> Result<Self> {
        if adapters.is_empty() {
            return Err(TeamError::InvalidTeam(
                "a team needs at least one participant".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for adapter in &adapters {
            let p = adapter.participant();
            if !seen.insert(p.name.as_str()) {
                return Err(TeamError::InvalidTeam(format!(
                    "duplicate participant name: {}",
                    p.name
                )));
            }
            if p.max_consecutive_turns == 0 {
                return Err(TeamError::InvalidTeam(format!(
                    "{}: max_consecutive_turns must be at least 1",
                    p.name
                )));
            }
        }

        let turns = vec![TurnState::default(); adapters.len()];
        Ok(Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            team_name: team_name.into(),
            adapters,
            turns,
            runtime,
            control: SessionControl::new(),
            observers: ObserverSet::default(),
            trajectory: Vec::new(),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Share an existing control handle instead of the default one.
    pub fn with_control(mut self, control: SessionControl) -> Self {
        self.control = control;
        self
    }

    /// Handle for resolving or cancelling the session from outside.
    pub fn control(&self) -> SessionControl {
        self.control.clone()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn adapters(&self) -> &[AgentAdapter] {
        &self.adapters
    }

    pub fn turn_state(&self, index: usize) -> Option<TurnState> {
        self.turns.get(index).copied()
    }

    pub fn trajectory(&self) -> &[Step] {
        &self.trajectory
    }

    /// Seed every history with the problem statement.
    pub fn seed_task(&mut self, statement: &str) {
        for adapter in &mut self.adapters {
            adapter.accept(HistoryEntry::Task {
                statement: statement.to_string(),
            });
        }
    }

    /// Run one iteration. Returns the termination reason once the session
    /// is over; `state.terminated` is set at the same time.
    pub async fn run_iteration(&mut self, state: &mut SessionState) -> Option<TerminationReason> {
        if let Some(reason) = &state.terminated {
            return Some(reason.clone());
        }
        if let Some(reason) = self.check_termination(state) {
            state.terminated = Some(reason.clone());
            return Some(reason);
        }

        let index = state.active_index;
        let cap = allocate(self.adapters[index].participant(), &self.turns[index]);
        let turn = match self.adapters[index]
            .take_turn(self.runtime.as_ref(), cap)
            .await
        {
            Ok(turn) => turn,
            Err(aborted) => return Some(Self::abort(state, aborted)),
        };

        state.global_step_count += 1 + u64::from(turn.retries_used);
        let step = turn.draft.finalize(state.global_step_count);
        self.adapters[index].record(step.clone());

        let signal = classify_for(self.adapters[index].participant(), &step);
        let handoff = matches!(signal, ControlSignal::Handoff { .. });
        propagate(&step, index, &mut self.adapters, handoff);

        METRICS.inc_steps_recorded();
        obs::emit_step_recorded(
            &self.session_id,
            &step.author,
            step.sequence,
            step.action.kind(),
            step.retry_index,
        );
        self.trajectory.push(step.clone());
        self.observers.step_recorded(&step).await;

        if let Some(resolution) = turn.resolution {
            self.control.mark_resolved_with(resolution.submission);
        }

        match signal {
            ControlSignal::Question { text, target } => {
                if let Err(aborted) = self.exchange_question(index, text, target).await {
                    return Some(Self::abort(state, aborted));
                }
            }
            ControlSignal::Handoff { message } => {
                METRICS.inc_handoffs();
                obs::emit_handoff(&step.author, message.as_deref());
                self.apply_rotation(state, index, turn.retries_used, true)
                    .await;
            }
            ControlSignal::Plain => {
                self.apply_rotation(state, index, turn.retries_used, false)
                    .await;
            }
        }
        None
    }

    /// Drive the session to completion.
    pub async fn run_session(self, step_budget: Option<u64>) -> SessionReport {
        let span = obs::session_span(&self.session_id);
        self.drive(step_budget).instrument(span).await
    }

    async fn drive(mut self, step_budget: Option<u64>) -> SessionReport {
        let started = Instant::now();
        let mut state = SessionState::new(step_budget);

        let participants: Vec<String> =
            self.adapters.iter().map(|a| a.name().to_string()).collect();
        obs::emit_session_started(&self.session_id, &self.team_name, participants.len());
        self.observers
            .session_start(&SessionStarted {
                session_id: self.session_id.clone(),
                team_name: self.team_name.clone(),
                participants,
                step_budget,
            })
            .await;

        let termination = loop {
            if let Some(reason) = self.run_iteration(&mut state).await {
                break reason;
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        obs::emit_session_finished(
            &self.session_id,
            duration_ms,
            state.global_step_count,
            &termination,
        );
        METRICS.flush();

        let submission = match &termination {
            TerminationReason::Resolved { submission } => submission.clone(),
            _ => self.control.submission(),
        };
        let observers = self.observers.clone();
        let report = SessionReport {
            session_id: self.session_id,
            team_name: self.team_name,
            termination,
            state,
            submission,
            trajectory: self.trajectory,
            histories: self
                .adapters
                .into_iter()
                .map(AgentAdapter::into_history)
                .collect(),
            duration_ms,
        };
        observers.session_end(&report).await;
        report
    }

    fn check_termination(&self, state: &SessionState) -> Option<TerminationReason> {
        if self.control.is_resolved() {
            return Some(TerminationReason::Resolved {
                submission: self.control.submission(),
            });
        }
        if self.control.is_cancelled() {
            return Some(TerminationReason::Cancelled);
        }
        match state.step_budget {
            Some(budget) if state.global_step_count >= budget => {
                Some(TerminationReason::StepBudgetExhausted)
            }
            _ => None,
        }
    }

    fn abort(state: &mut SessionState, aborted: SessionAborted) -> TerminationReason {
        warn!(event = "session.aborted", reason = %aborted.reason);
        let reason = TerminationReason::Aborted {
            reason: aborted.reason,
        };
        state.terminated = Some(reason.clone());
        reason
    }

    async fn exchange_question(
        &mut self,
        asker: usize,
        text: String,
        target: Option<String>,
    ) -> std::result::Result<(), SessionAborted> {
        let resolved = {
            let names: Vec<&str> = self.adapters.iter().map(|a| a.name()).collect();
            resolve_target(asker, target.as_deref(), &names)
        };
        let target_index = match resolved {
            Ok(index) => index,
            Err(e) => {
                warn!(event = "question.no_target", asker = %e.asker, target = %e.target);
                self.adapters[asker].accept(HistoryEntry::Notice {
                    message: e.to_string(),
                });
                return Ok(());
            }
        };

        let question = PendingQuestion {
            asker: self.adapters[asker].name().to_string(),
            text,
        };
        let answerer = self.adapters[target_index].name().to_string();
        METRICS.inc_questions();
        obs::emit_question_asked(&question.asker, &answerer);

        let answer = self.adapters[target_index].answer(&question).await?;
        obs::emit_question_answered(&question.asker, &answerer, answer.len());
        self.adapters[asker].accept(HistoryEntry::Answer {
            from: answerer,
            question: question.text,
            answer,
        });
        Ok(())
    }

    async fn apply_rotation(
        &mut self,
        state: &mut SessionState,
        index: usize,
        retries: u32,
        handoff: bool,
    ) {
        let max = self.adapters[index].participant().max_consecutive_turns;
        let turn = &mut self.turns[index];
        turn.consecutive_turns += 1;
        if retries > 0 {
            turn.consecutive_turns += 1;
        }
        if handoff {
            turn.consecutive_turns = max;
        }
        if turn.consecutive_turns < max {
            return;
        }

        turn.consecutive_turns = 0;
        state.active_index = (index + 1) % self.adapters.len();
        METRICS.inc_rotations();

        let from = self.adapters[index].name().to_string();
        let to = self.adapters[state.active_index].name().to_string();
        obs::emit_rotation(&from, &to, handoff);
        self.observers.rotation(&from, &to).await;
    }
}

impl std::fmt::Debug for TeamOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamOrchestrator")
            .field("session_id", &self.session_id)
            .field("team_name", &self.team_name)
            .field("adapters", &self.adapters)
            .field("turns", &self.turns)
            .finish_non_exhaustive()
    }
}
