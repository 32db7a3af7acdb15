//! What each participant gets to see of its teammates' work.

use std::sync::Arc;

use serde_json::json;
use tagteam_core::{
    Action, AgentAdapter, HistoryEntry, Outcome, Participant, RawAction, ScriptedPolicy,
    ScriptedRuntime, SessionState, TeamOrchestrator,
};

fn bash(cmd: &str) -> RawAction {
    RawAction::tool("bash", json!({ "command": cmd }))
}

fn policy(actions: Vec<RawAction>) -> Arc<ScriptedPolicy> {
    Arc::new(ScriptedPolicy::new(actions.into_iter().map(Ok).collect()))
}

fn trio(driver: Arc<ScriptedPolicy>, runtime: ScriptedRuntime) -> TeamOrchestrator {
    let adapters = vec![
        AgentAdapter::new(Participant::new("driver", 0, 3), driver),
        AgentAdapter::new(
            Participant::new("navigator", 1, 3)
                .sharing_only_tool_results(true)
                .with_max_observation_chars(Some(5)),
            policy(vec![]),
        ),
        AgentAdapter::new(Participant::new("reviewer", 2, 3), policy(vec![])),
    ];
    TeamOrchestrator::new("trio", adapters, Arc::new(runtime)).unwrap()
}

#[tokio::test]
async fn share_only_recipients_get_trimmed_copies() {
    let driver = policy(vec![bash("ls").with_thought("look around first")]);
    let runtime = ScriptedRuntime::new().respond("ls", "0123456789");
    let mut orchestrator = trio(driver, runtime);
    let mut state = SessionState::new(None);

    orchestrator.run_iteration(&mut state).await;

    let navigator: Vec<_> = orchestrator.adapters()[1].history().mirrored().collect();
    assert_eq!(navigator.len(), 1);
    assert_eq!(navigator[0].source, "driver");
    assert!(navigator[0].trimmed);
    assert_eq!(navigator[0].thought, None);
    assert_eq!(navigator[0].outcome, Outcome::success("01234"));
    assert_eq!(navigator[0].elided_chars, 5);

    let reviewer: Vec<_> = orchestrator.adapters()[2].history().mirrored().collect();
    assert_eq!(reviewer.len(), 1);
    assert!(!reviewer[0].trimmed);
    assert_eq!(reviewer[0].thought.as_deref(), Some("look around first"));
    assert_eq!(reviewer[0].outcome, Outcome::success("0123456789"));

    // The author keeps its own step, not a mirrored copy.
    let driver_history = orchestrator.adapters()[0].history();
    assert_eq!(driver_history.native_steps().count(), 1);
    assert_eq!(driver_history.mirrored().count(), 0);
}

#[tokio::test]
async fn handoff_steps_are_copied_in_full() {
    let driver = policy(vec![RawAction::tool(
        "handoff",
        json!({ "message": "tests are failing in parser.rs" }),
    )
    .with_thought("I am stuck on the parser")]);
    let mut orchestrator = trio(driver, ScriptedRuntime::new());
    let mut state = SessionState::new(None);

    orchestrator.run_iteration(&mut state).await;
    assert_eq!(state.active_index, 1);

    let navigator: Vec<_> = orchestrator.adapters()[1].history().mirrored().collect();
    assert!(!navigator[0].trimmed);
    assert_eq!(
        navigator[0].thought.as_deref(),
        Some("I am stuck on the parser")
    );
}

#[tokio::test]
async fn retries_stay_private_to_their_author() {
    let driver = policy(vec![RawAction::text("thinking out loud"), bash("ls")]);
    let mut orchestrator = trio(driver.clone(), ScriptedRuntime::new());
    let mut state = SessionState::new(None);

    orchestrator.run_iteration(&mut state).await;

    // Second proposal saw the correction context.
    let seen = driver.seen_histories();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].retries().count(), 0);
    assert_eq!(seen[1].retries().count(), 1);

    for teammate in &orchestrator.adapters()[1..] {
        assert_eq!(teammate.history().retries().count(), 0);
        assert_eq!(teammate.history().mirrored().count(), 1);
    }
}

#[tokio::test]
async fn mirrored_copies_arrive_in_sequence_order() {
    let driver = policy(vec![bash("a"), bash("b"), bash("c")]);
    let mut orchestrator = trio(driver, ScriptedRuntime::new());
    orchestrator.seed_task("fix the flaky test");
    let mut state = SessionState::new(None);

    for _ in 0..3 {
        orchestrator.run_iteration(&mut state).await;
    }

    for adapter in orchestrator.adapters() {
        assert!(matches!(
            adapter.history().entries().first(),
            Some(HistoryEntry::Task { statement }) if statement == "fix the flaky test"
        ));
    }

    let sequences: Vec<u64> = orchestrator.adapters()[2]
        .history()
        .mirrored()
        .map(|m| m.sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);
}

#[tokio::test]
async fn exhausted_format_errors_reach_share_only_teammates_without_prose() {
    let rambling = "my private rationale: I suspect the parser";
    let adapters = vec![
        AgentAdapter::new(
            Participant::new("driver", 0, 3).with_max_requeries(1),
            policy(vec![RawAction::text(rambling)]),
        ),
        AgentAdapter::new(
            Participant::new("navigator", 1, 3).sharing_only_tool_results(true),
            policy(vec![]),
        ),
    ];
    let mut orchestrator =
        TeamOrchestrator::new("pair", adapters, Arc::new(ScriptedRuntime::new())).unwrap();
    let mut state = SessionState::new(None);

    orchestrator.run_iteration(&mut state).await;

    let step = &orchestrator.trajectory()[0];
    assert!(step.retry_budget_exhausted);
    assert!(matches!(&step.action, Action::Malformed { raw } if raw == rambling));

    let navigator: Vec<_> = orchestrator.adapters()[1].history().mirrored().collect();
    assert_eq!(navigator.len(), 1);
    assert!(navigator[0].trimmed);
    assert_eq!(navigator[0].action, Action::Malformed { raw: String::new() });
    assert_eq!(navigator[0].outcome, step.outcome);
    let shown = serde_json::to_string(navigator[0]).unwrap();
    assert!(!shown.contains("rationale"));
}
