//! Sessions recorded through `LedgerRecorder` and trajectory artifacts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tagteam_core::{
    read_trajectory_artifact, write_trajectory_artifact, AgentAdapter, LedgerRecorder,
    Participant, RawAction, ScriptedPolicy, ScriptedRuntime, SessionObserver, SessionReport,
    Step, TeamError, TeamOrchestrator, TerminationReason, TrajectoryArtifact,
};
use tagteam_state::{FsTrajectoryLedger, MemoryTrajectoryLedger, SessionStatus, TrajectoryLedger};
use tempfile::tempdir;

fn bash(cmd: &str) -> RawAction {
    RawAction::tool("bash", json!({ "command": cmd }))
}

fn pair(driver: Vec<RawAction>, navigator: Vec<RawAction>) -> TeamOrchestrator {
    let policy = |actions: Vec<RawAction>| {
        Arc::new(ScriptedPolicy::new(actions.into_iter().map(Ok).collect()))
    };
    TeamOrchestrator::new(
        "pair",
        vec![
            AgentAdapter::new(Participant::new("driver", 0, 2), policy(driver)),
            AgentAdapter::new(Participant::new("navigator", 1, 2), policy(navigator)),
        ],
        Arc::new(ScriptedRuntime::new()),
    )
    .unwrap()
}

#[tokio::test]
async fn recorder_persists_every_step() {
    let ledger = Arc::new(MemoryTrajectoryLedger::new());
    let recorder = Arc::new(LedgerRecorder::new(ledger.clone()));

    let report = pair(
        vec![bash("a"), RawAction::text("oops"), bash("b")],
        vec![bash("c")],
    )
    .with_observer(recorder.clone())
    .run_session(Some(4))
    .await;

    assert_eq!(report.termination, TerminationReason::StepBudgetExhausted);

    let id = recorder.ledger_session_id().await.unwrap();
    let entries = ledger.get_entries(&id).await.unwrap();
    assert_eq!(entries.len(), report.trajectory.len());
    assert_eq!(recorder.recorded(), entries.len() as u64);

    let seqs: Vec<u64> = entries.iter().map(|e| e.seq).collect();
    let expected: Vec<u64> = report.trajectory.iter().map(|s| s.sequence).collect();
    assert_eq!(seqs, expected);

    let stored: Step = serde_json::from_value(entries[1].payload.clone()).unwrap();
    assert_eq!(stored.retry_index, 1);

    let record = ledger.get_session(&id).await.unwrap();
    assert_eq!(record.status, SessionStatus::Completed);
    assert_eq!(record.metadata.participants, vec!["driver", "navigator"]);
    let summary = record.summary.unwrap();
    assert_eq!(summary.total_steps, report.state.global_step_count);
    assert_eq!(summary.exit_status, "step_budget_exhausted");
}

#[tokio::test]
async fn aborted_sessions_are_marked_aborted() {
    let ledger = Arc::new(MemoryTrajectoryLedger::new());
    let recorder = Arc::new(LedgerRecorder::new(ledger.clone()));

    // Driver's script runs dry on its second turn.
    let report = pair(vec![bash("a")], vec![])
        .with_observer(recorder.clone())
        .run_session(None)
        .await;
    assert!(matches!(report.termination, TerminationReason::Aborted { .. }));

    let id = recorder.ledger_session_id().await.unwrap();
    let record = ledger.get_session(&id).await.unwrap();
    assert_eq!(record.status, SessionStatus::Aborted);
    assert_eq!(ledger.get_entries(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_sessions_are_marked_cancelled_on_disk() {
    let dir = tempdir().unwrap();
    let ledger = Arc::new(FsTrajectoryLedger::new(dir.path()).await.unwrap());
    let recorder = Arc::new(LedgerRecorder::new(ledger.clone()));

    let orchestrator = pair(vec![bash("a")], vec![]).with_observer(recorder.clone());
    orchestrator.control().cancel();
    orchestrator.run_session(None).await;

    let id = recorder.ledger_session_id().await.unwrap();
    let record = ledger.get_session(&id).await.unwrap();
    assert_eq!(record.status, SessionStatus::Cancelled);
    assert!(ledger.get_entries(&id).await.unwrap().is_empty());
}

struct FailingObserver {
    calls: AtomicUsize,
}

#[async_trait]
impl SessionObserver for FailingObserver {
    async fn on_step_recorded(&self, _step: &Step) -> tagteam_core::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TeamError::InvalidTeam("observer is broken".to_string()))
    }

    async fn on_session_end(&self, _report: &SessionReport) -> tagteam_core::Result<()> {
        Err(TeamError::InvalidTeam("observer is broken".to_string()))
    }
}

#[tokio::test]
async fn observer_failures_do_not_stop_the_session() {
    let observer = Arc::new(FailingObserver {
        calls: AtomicUsize::new(0),
    });
    let report = pair(vec![bash("a"), bash("b")], vec![bash("c")])
        .with_observer(observer.clone())
        .run_session(Some(3))
        .await;

    assert_eq!(report.termination, TerminationReason::StepBudgetExhausted);
    assert_eq!(observer.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn artifact_round_trip_keeps_retries() {
    let report = pair(
        vec![RawAction::text("no fence"), bash("a")],
        vec![bash("c"), bash("d")],
    )
    .run_session(Some(4))
    .await;

    let dir = tempdir().unwrap();
    let artifact = TrajectoryArtifact::from_report(&report).unwrap();
    write_trajectory_artifact(&artifact, dir.path()).unwrap();

    let loaded = read_trajectory_artifact(&report.session_id, dir.path()).unwrap();
    assert_eq!(loaded.steps, report.trajectory);
    assert_eq!(loaded.retry_count(), 1);
    assert_eq!(loaded.info.total_steps, 4);
    assert_eq!(loaded.steps_by_author().get("driver"), Some(&1));
    assert_eq!(loaded.steps_by_author().get("navigator"), Some(&2));
}
