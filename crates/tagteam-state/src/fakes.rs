//! In-memory fake for the trajectory ledger (testing and dry runs)
//!
//! `MemoryTrajectoryLedger` satisfies the `TrajectoryLedger` contract without
//! touching the filesystem.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

#[derive(Debug)]
struct SessionState {
    record: SessionRecord,
    entries: Vec<TrajectoryEntry>,
}

/// In-memory trajectory ledger backed by a `HashMap<SessionId, SessionState>`.
#[derive(Debug, Default)]
pub struct MemoryTrajectoryLedger {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl MemoryTrajectoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SessionState>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
        summary: SessionSummary,
    ) -> StorageResult<()> {
        let mut sessions = self.sessions();
        let state = sessions
            .get_mut(&session_id.0)
            .ok_or_else(|| StorageError::SessionNotFound {
                session_id: session_id.0.clone(),
            })?;
        state.record.finish(status, summary)
    }
}

#[async_trait]
impl TrajectoryLedger for MemoryTrajectoryLedger {
    async fn create_session(&self, metadata: SessionMetadata) -> StorageResult<SessionId> {
        let session_id = SessionId::new();
        let record = SessionRecord::new(session_id.clone(), metadata);
        self.sessions().insert(
            session_id.0.clone(),
            SessionState {
                record,
                entries: Vec::new(),
            },
        );
        Ok(session_id)
    }

    async fn append_entry(
        &self,
        session_id: &SessionId,
        entry: TrajectoryEntry,
    ) -> StorageResult<()> {
        let mut sessions = self.sessions();
        let state = sessions
            .get_mut(&session_id.0)
            .ok_or_else(|| StorageError::SessionNotFound {
                session_id: session_id.0.clone(),
            })?;
        state.record.ensure_running()?;
        state.record.accept_seq(entry.seq)?;
        state.entries.push(entry);
        Ok(())
    }

    async fn complete_session(
        &self,
        session_id: &SessionId,
        summary: SessionSummary,
    ) -> StorageResult<()> {
        self.finish(session_id, SessionStatus::Completed, summary)
    }

    async fn abort_session(
        &self,
        session_id: &SessionId,
        summary: SessionSummary,
    ) -> StorageResult<()> {
        self.finish(session_id, SessionStatus::Aborted, summary)
    }

    async fn cancel_session(
        &self,
        session_id: &SessionId,
        summary: SessionSummary,
    ) -> StorageResult<()> {
        self.finish(session_id, SessionStatus::Cancelled, summary)
    }

    async fn get_session(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        self.sessions()
            .get(&session_id.0)
            .map(|s| s.record.clone())
            .ok_or_else(|| StorageError::SessionNotFound {
                session_id: session_id.0.clone(),
            })
    }

    async fn get_entries(&self, session_id: &SessionId) -> StorageResult<Vec<TrajectoryEntry>> {
        let sessions = self.sessions();
        let state = sessions
            .get(&session_id.0)
            .ok_or_else(|| StorageError::SessionNotFound {
                session_id: session_id.0.clone(),
            })?;
        let mut entries = state.entries.clone();
        entries.sort_by_key(|e| e.seq);
        Ok(entries)
    }

    async fn list_sessions(&self, team_name: Option<&str>) -> StorageResult<Vec<SessionRecord>> {
        let sessions = self.sessions();
        let mut records: Vec<SessionRecord> = sessions
            .values()
            .filter(|s| team_name.map_or(true, |t| s.record.metadata.team_name == t))
            .map(|s| s.record.clone())
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}
