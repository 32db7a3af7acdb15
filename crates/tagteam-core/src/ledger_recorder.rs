//! Observer that persists a session's steps into a [`TrajectoryLedger`].
//!
//! # Usage
//!
//! ```rust,ignore
//! let ledger = Arc::new(FsTrajectoryLedger::new("runs").await?);
//! let recorder = Arc::new(LedgerRecorder::new(ledger));
//! let report = orchestrator.with_observer(recorder.clone()).run_session(None).await;
//! let ledger_id = recorder.ledger_session_id().await;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use tagteam_state::storage_traits::{
    SessionId, SessionMetadata, SessionSummary, TrajectoryEntry, TrajectoryLedger,
};

use crate::domain::{Result, Step, TerminationReason};
use crate::scheduling::observer::{SessionObserver, SessionStarted};
use crate::scheduling::orchestrator::SessionReport;

/// Persists every recorded step as it happens.
///
/// - Creates a ledger session on `on_session_start`
/// - Appends one entry per step on `on_step_recorded`, keyed by the step's
///   global sequence number
/// - Completes, aborts or cancels the ledger session on `on_session_end`
pub struct LedgerRecorder<L: TrajectoryLedger> {
    ledger: Arc<L>,
    session_id: RwLock<Option<SessionId>>,
    recorded: AtomicU64,
}

impl<L: TrajectoryLedger> LedgerRecorder<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self {
            ledger,
            session_id: RwLock::new(None),
            recorded: AtomicU64::new(0),
        }
    }

    /// Ledger-side session id (available after `on_session_start`).
    pub async fn ledger_session_id(&self) -> Option<SessionId> {
        self.session_id.read().await.clone()
    }

    /// Entries appended so far.
    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::SeqCst)
    }

    async fn require_session(&self) -> Result<SessionId> {
        self.session_id.read().await.clone().ok_or_else(|| {
            crate::domain::TeamError::InvalidTeam(
                "ledger recorder used before on_session_start".to_string(),
            )
        })
    }
}

#[async_trait]
impl<L: TrajectoryLedger + 'static> SessionObserver for LedgerRecorder<L> {
    #[instrument(skip_all, fields(session_id = %session.session_id))]
    async fn on_session_start(&self, session: &SessionStarted) -> Result<()> {
        let metadata = SessionMetadata {
            team_name: session.team_name.clone(),
            participants: session.participants.clone(),
            tags: json!({
                "orchestrator_session_id": session.session_id,
                "step_budget": session.step_budget,
            }),
        };
        let id = self.ledger.create_session(metadata).await?;
        debug!(ledger_session_id = %id, "ledger session created");
        *self.session_id.write().await = Some(id);
        Ok(())
    }

    async fn on_step_recorded(&self, step: &Step) -> Result<()> {
        let id = self.require_session().await?;
        let entry = TrajectoryEntry {
            seq: step.sequence,
            author: step.author.clone(),
            kind: step.action.kind().to_string(),
            payload: serde_json::to_value(step)?,
            timestamp: Utc::now(),
        };
        self.ledger.append_entry(&id, entry).await?;
        self.recorded.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_session_end(&self, report: &SessionReport) -> Result<()> {
        let id = self.require_session().await?;
        let summary = SessionSummary {
            total_steps: report.state.global_step_count,
            recorded_entries: self.recorded(),
            exit_status: report.termination.to_string(),
            submission: report.submission.clone(),
            duration_ms: report.duration_ms,
        };
        match report.termination {
            TerminationReason::Resolved { .. } | TerminationReason::StepBudgetExhausted => {
                self.ledger.complete_session(&id, summary).await?
            }
            TerminationReason::Cancelled => self.ledger.cancel_session(&id, summary).await?,
            TerminationReason::Aborted { .. } => self.ledger.abort_session(&id, summary).await?,
        }
        Ok(())
    }
}
