//! Per-participant append-only histories.
//!
//! A [`History`] is owned by exactly one participant. Other participants'
//! steps only ever arrive as [`MirroredStep`] copies.

use serde::{Deserialize, Serialize};

use super::step::{Action, FailedAttempt, Outcome, Step};

/// A copy of another participant's step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirroredStep {
    /// Name of the participant that produced the step.
    pub source: String,
    pub sequence: u64,
    /// `None` for trimmed copies.
    pub thought: Option<String>,
    pub action: Action,
    pub outcome: Outcome,
    /// The copy omits rationale text.
    pub trimmed: bool,
    /// Characters cut from the observation by truncation.
    pub elided_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum HistoryEntry {
    /// Problem statement every history starts with.
    Task { statement: String },
    /// A step this participant produced.
    Step(Step),
    /// A failed attempt fed back to the policy as correction context.
    Retry(FailedAttempt),
    /// A step produced by someone else.
    Mirrored(MirroredStep),
    /// Another participant's answer to a question this participant asked.
    Answer {
        from: String,
        question: String,
        answer: String,
    },
    /// Out-of-band observation, e.g. an unanswerable question.
    Notice { message: String },
    /// A question put to this participant. Only appears in ephemeral views.
    Question { from: String, text: String },
}

/// Ordered, append-only record of what one participant has seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    owner: String,
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            entries: Vec::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub(crate) fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Copy of this history with one extra entry that is never persisted.
    pub fn with_ephemeral(&self, entry: HistoryEntry) -> History {
        let mut view = self.clone();
        view.entries.push(entry);
        view
    }

    pub fn retries(&self) -> impl Iterator<Item = &FailedAttempt> {
        self.entries.iter().filter_map(|e| match e {
            HistoryEntry::Retry(attempt) => Some(attempt),
            _ => None,
        })
    }

    pub fn mirrored(&self) -> impl Iterator<Item = &MirroredStep> {
        self.entries.iter().filter_map(|e| match e {
            HistoryEntry::Mirrored(m) => Some(m),
            _ => None,
        })
    }

    pub fn native_steps(&self) -> impl Iterator<Item = &Step> {
        self.entries.iter().filter_map(|e| match e {
            HistoryEntry::Step(s) => Some(s),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_view_leaves_original_untouched() {
        let mut history = History::new("navigator");
        history.push(HistoryEntry::Task {
            statement: "fix the build".to_string(),
        });

        let view = history.with_ephemeral(HistoryEntry::Question {
            from: "driver".to_string(),
            text: "status?".to_string(),
        });

        assert_eq!(view.len(), 2);
        assert_eq!(history.len(), 1);
        assert_eq!(view.owner(), "navigator");
    }
}
