//! Participant identity and static per-agent configuration.

use serde::{Deserialize, Serialize};

/// One member of the team. Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique name within the team; questions address participants by it.
    pub name: String,
    /// Ordinal position in the rotation.
    pub position: usize,
    /// Turns this participant may take before it is rotated away (≥ 1).
    pub max_consecutive_turns: u32,
    /// Self-correction retries allowed per step before the turn budget cap.
    pub max_requeries: u32,
    /// Receive only tool calls and outcomes from others, never their rationale.
    pub share_only_tool_results: bool,
    /// Whether a handoff from this participant transfers the turn.
    pub handoff_enabled: bool,
    /// Truncate observations in trimmed mirrors to this many characters.
    pub max_observation_chars: Option<usize>,
}

impl Participant {
    pub fn new(name: impl Into<String>, position: usize, max_consecutive_turns: u32) -> Self {
        Self {
            name: name.into(),
            position,
            max_consecutive_turns,
            max_requeries: crate::config::DEFAULT_MAX_REQUERIES,
            share_only_tool_results: false,
            handoff_enabled: true,
            max_observation_chars: None,
        }
    }

    pub fn with_max_requeries(mut self, max_requeries: u32) -> Self {
        self.max_requeries = max_requeries;
        self
    }

    pub fn sharing_only_tool_results(mut self, share_only: bool) -> Self {
        self.share_only_tool_results = share_only;
        self
    }

    pub fn with_handoff(mut self, enabled: bool) -> Self {
        self.handoff_enabled = enabled;
        self
    }

    pub fn with_max_observation_chars(mut self, limit: Option<usize>) -> Self {
        self.max_observation_chars = limit;
        self
    }
}
