//! Storage trait definitions for tagteam
//!
//! - `ContentDigest`: SHA-256 hex digest used to integrity-check artifacts
//! - `TrajectoryLedger`: Session trajectory persistence (entries, summaries)
//!
//! The ledger is async and backend-agnostic. An in-memory fake lives in the
//! `fakes` module and a filesystem backend in `fs_ledger`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TrajectoryLedger
// ---------------------------------------------------------------------------

/// Unique identifier for a recorded session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random SessionId
    pub fn new() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata attached to a session at creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Team name from the session configuration
    pub team_name: String,
    /// Participant names in rotation order
    pub participants: Vec<String>,
    /// Arbitrary key-value tags
    pub tags: serde_json::Value,
}

/// A single recorded step in a session trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    /// Global step sequence number; strictly increasing within a session
    pub seq: u64,
    /// Name of the participant that produced the step
    pub author: String,
    /// Action kind ("tool_call", "handoff", "question", "malformed")
    pub kind: String,
    /// Full step payload
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Summary produced when a session ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Global step count including retries
    pub total_steps: u64,
    /// Number of entries appended to the ledger
    pub recorded_entries: u64,
    /// Human-readable termination reason
    pub exit_status: String,
    /// Final submission, if the task was resolved with one
    pub submission: Option<String>,
    pub duration_ms: u64,
}

/// Status of a recorded session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Running,
    Completed,
    Aborted,
    Cancelled,
}

/// Full session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub metadata: SessionMetadata,
    pub status: SessionStatus,
    pub summary: Option<SessionSummary>,
    /// Sequence number of the last appended entry
    pub last_seq: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Fresh record in the `Running` state.
    pub fn new(session_id: SessionId, metadata: SessionMetadata) -> Self {
        Self {
            session_id,
            metadata,
            status: SessionStatus::Running,
            summary: None,
            last_seq: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Fail unless the session still accepts entries.
    pub fn ensure_running(&self) -> StorageResult<()> {
        if self.status != SessionStatus::Running {
            return Err(StorageError::InvalidSessionState {
                session_id: self.session_id.0.clone(),
                status: format!("{:?}", self.status),
                expected: "Running".to_string(),
            });
        }
        Ok(())
    }

    /// Check that `seq` follows the last appended entry and advance.
    pub fn accept_seq(&mut self, seq: u64) -> StorageResult<()> {
        if let Some(last_seq) = self.last_seq {
            if seq <= last_seq {
                return Err(StorageError::OutOfOrderEntry {
                    session_id: self.session_id.0.clone(),
                    seq,
                    last_seq,
                });
            }
        }
        self.last_seq = Some(seq);
        Ok(())
    }

    /// Move a running session into a terminal status.
    pub fn finish(&mut self, status: SessionStatus, summary: SessionSummary) -> StorageResult<()> {
        self.ensure_running()?;
        self.status = status;
        self.summary = Some(summary);
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// Session trajectory ledger.
///
/// Guarantees:
/// - Entries are ordered by strictly increasing `seq` within a session.
/// - A session transitions: Running → Completed | Aborted | Cancelled (terminal).
/// - Finished sessions are immutable.
#[async_trait]
pub trait TrajectoryLedger: Send + Sync {
    /// Create a new session, returning its unique ID.
    async fn create_session(&self, metadata: SessionMetadata) -> StorageResult<SessionId>;

    /// Append an entry to a running session.
    async fn append_entry(&self, session_id: &SessionId, entry: TrajectoryEntry)
        -> StorageResult<()>;

    /// Mark a session as completed (resolved or budget exhausted).
    async fn complete_session(
        &self,
        session_id: &SessionId,
        summary: SessionSummary,
    ) -> StorageResult<()>;

    /// Mark a session as aborted by a fatal collaborator failure.
    async fn abort_session(&self, session_id: &SessionId, summary: SessionSummary)
        -> StorageResult<()>;

    /// Mark a session as cancelled by its caller.
    async fn cancel_session(
        &self,
        session_id: &SessionId,
        summary: SessionSummary,
    ) -> StorageResult<()>;

    /// Retrieve a session record by ID.
    async fn get_session(&self, session_id: &SessionId) -> StorageResult<SessionRecord>;

    /// Retrieve all entries for a session, ordered by seq.
    async fn get_entries(&self, session_id: &SessionId) -> StorageResult<Vec<TrajectoryEntry>>;

    /// List sessions, optionally filtered by team name.
    async fn list_sessions(&self, team_name: Option<&str>) -> StorageResult<Vec<SessionRecord>>;
}
