//! Error types for tagteam-state

use thiserror::Error;

/// Errors that can occur in the trajectory persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// No session with this ID exists in the ledger
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Session is in a state that does not allow the requested operation
    #[error("session {session_id} is {status}, expected {expected}")]
    InvalidSessionState {
        session_id: String,
        status: String,
        expected: String,
    },

    /// Entry sequence numbers must be strictly increasing within a session
    #[error("session {session_id}: entry seq {seq} does not follow last seq {last_seq}")]
    OutOfOrderEntry {
        session_id: String,
        seq: u64,
        last_seq: u64,
    },

    /// String is not a valid SHA-256 hex digest
    #[error("invalid digest: {digest}")]
    InvalidDigest { digest: String },

    /// Serialization error
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
