//! Error taxonomy for tagteam sessions.
//!
//! Only [`SessionAborted`] ever escapes a turn. Format, execution and
//! question-target failures are recovered inside the turn that produced
//! them and end up recorded as step outcomes or observations.

use crate::config::ConfigError;

/// Policy output could not be parsed into an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("format error: {detail}")]
pub struct FormatError {
    pub detail: String,
}

impl FormatError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// The runtime reported that a tool invocation failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tool {tool} failed: {detail}")]
pub struct ToolExecutionError {
    pub tool: String,
    pub detail: String,
}

/// A question named a participant that cannot answer it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no agent named {target:?} can answer a question from {asker}")]
pub struct NoTargetAgentError {
    pub asker: String,
    pub target: String,
}

/// A collaborator became unreachable; the session cannot continue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("session aborted: {reason}")]
pub struct SessionAborted {
    pub reason: String,
}

/// Errors raised while setting up or persisting a session.
#[derive(Debug, thiserror::Error)]
pub enum TeamError {
    #[error("invalid team: {0}")]
    InvalidTeam(String),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] tagteam_state::StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tagteam operations.
pub type Result<T> = std::result::Result<T, TeamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_target_message_names_both_sides() {
        let err = NoTargetAgentError {
            asker: "driver".to_string(),
            target: "reviewer".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("driver"));
        assert!(msg.contains("\"reviewer\""));
    }

    #[test]
    fn test_digest_mismatch_error() {
        let err = TeamError::DigestMismatch {
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }
}
