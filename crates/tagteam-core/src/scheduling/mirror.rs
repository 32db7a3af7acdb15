//! Selective propagation of recorded steps into other participants'
//! histories.

use crate::domain::{Action, HistoryEntry, MirroredStep, Outcome, Participant, Step};

use super::adapter::AgentAdapter;

/// Build the copy of `step` that `recipient` gets to see.
///
/// A handoff, or a recipient that shares everything, gets the full record.
/// Otherwise the rationale is dropped, so is the prose of an output that
/// never parsed, and the observation is truncated to the recipient's
/// `max_observation_chars`.
pub fn mirror_step(step: &Step, recipient: &Participant, handoff: bool) -> MirroredStep {
    if handoff || !recipient.share_only_tool_results {
        return MirroredStep {
            source: step.author.clone(),
            sequence: step.sequence,
            thought: step.thought.clone(),
            action: step.action.clone(),
            outcome: step.outcome.clone(),
            trimmed: false,
            elided_chars: 0,
        };
    }

    let (outcome, elided_chars) = match recipient.max_observation_chars {
        Some(limit) => truncate_outcome(&step.outcome, limit),
        None => (step.outcome.clone(), 0),
    };
    let action = match &step.action {
        Action::Malformed { .. } => Action::Malformed { raw: String::new() },
        other => other.clone(),
    };
    MirroredStep {
        source: step.author.clone(),
        sequence: step.sequence,
        thought: None,
        action,
        outcome,
        trimmed: true,
        elided_chars,
    }
}

/// Append a copy of `step` to every adapter except its author's.
pub fn propagate(step: &Step, source_index: usize, adapters: &mut [AgentAdapter], handoff: bool) {
    for (index, adapter) in adapters.iter_mut().enumerate() {
        if index == source_index {
            continue;
        }
        let copy = mirror_step(step, adapter.participant(), handoff);
        adapter.accept(HistoryEntry::Mirrored(copy));
    }
}

fn truncate_outcome(outcome: &Outcome, limit: usize) -> (Outcome, usize) {
    match outcome {
        Outcome::Success { observation } => {
            let (kept, elided) = truncate_chars(observation, limit);
            (Outcome::success(kept), elided)
        }
        Outcome::Error { kind, detail } => {
            let (kept, elided) = truncate_chars(detail, limit);
            (
                Outcome::Error {
                    kind: *kind,
                    detail: kept,
                },
                elided,
            )
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> (String, usize) {
    let total = text.chars().count();
    if total <= limit {
        return (text.to_string(), 0);
    }
    (text.chars().take(limit).collect(), total - limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StepErrorKind, ToolCall};
    use serde_json::json;

    fn step() -> Step {
        Step {
            author: "driver".to_string(),
            sequence: 4,
            thought: Some("the tests look flaky".to_string()),
            action: Action::ToolCall(ToolCall::new("bash", json!({ "command": "cargo test" }))),
            outcome: Outcome::success("test result: ok. 12 passed"),
            retry_index: 1,
            retry_budget_exhausted: false,
        }
    }

    #[test]
    fn sharing_recipient_gets_full_record() {
        let recipient = Participant::new("navigator", 1, 1);
        let copy = mirror_step(&step(), &recipient, false);
        assert!(!copy.trimmed);
        assert_eq!(copy.thought.as_deref(), Some("the tests look flaky"));
        assert_eq!(copy.source, "driver");
    }

    #[test]
    fn share_only_recipient_loses_rationale() {
        let recipient = Participant::new("navigator", 1, 1).sharing_only_tool_results(true);
        let copy = mirror_step(&step(), &recipient, false);
        assert!(copy.trimmed);
        assert!(copy.thought.is_none());
        assert_eq!(copy.outcome, step().outcome);
    }

    #[test]
    fn handoff_overrides_share_only() {
        let recipient = Participant::new("navigator", 1, 1)
            .sharing_only_tool_results(true)
            .with_max_observation_chars(Some(3));
        let copy = mirror_step(&step(), &recipient, true);
        assert!(!copy.trimmed);
        assert!(copy.thought.is_some());
        assert_eq!(copy.elided_chars, 0);
    }

    #[test]
    fn trimmed_copy_drops_unparsed_prose() {
        let mut garbled = step();
        garbled.action = Action::Malformed {
            raw: "I suspect the parser".to_string(),
        };
        garbled.outcome = Outcome::Error {
            kind: StepErrorKind::Format,
            detail: "no tool call found".to_string(),
        };
        let recipient = Participant::new("navigator", 1, 1).sharing_only_tool_results(true);
        let copy = mirror_step(&garbled, &recipient, false);
        assert_eq!(copy.action, Action::Malformed { raw: String::new() });
        assert_eq!(copy.outcome, garbled.outcome);

        let full = mirror_step(&garbled, &Participant::new("reviewer", 2, 1), false);
        assert_eq!(full.action, garbled.action);
    }

    #[test]
    fn trimmed_copy_truncates_observation() {
        let recipient = Participant::new("navigator", 1, 1)
            .sharing_only_tool_results(true)
            .with_max_observation_chars(Some(11));
        let copy = mirror_step(&step(), &recipient, false);
        assert_eq!(copy.outcome, Outcome::success("test result"));
        assert_eq!(copy.elided_chars, "test result: ok. 12 passed".len() - 11);
    }

    #[test]
    fn truncation_applies_to_error_detail() {
        let mut failing = step();
        failing.outcome = Outcome::Error {
            kind: StepErrorKind::ToolExecution,
            detail: "héllo wörld".to_string(),
        };
        let recipient = Participant::new("navigator", 1, 1)
            .sharing_only_tool_results(true)
            .with_max_observation_chars(Some(5));
        let copy = mirror_step(&failing, &recipient, false);
        assert_eq!(
            copy.outcome,
            Outcome::Error {
                kind: StepErrorKind::ToolExecution,
                detail: "héllo".to_string(),
            }
        );
        assert_eq!(copy.elided_chars, 6);
    }
}
