//! Filesystem-backed trajectory ledger.
//!
//! Layout: `<root>/sessions/<session_id>/session.json` holds the
//! [`SessionRecord`]; `<root>/sessions/<session_id>/entries.jsonl` holds one
//! [`TrajectoryEntry`] per line in append order.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::*;

const RECORD_FILE: &str = "session.json";
const ENTRIES_FILE: &str = "entries.jsonl";

/// Trajectory ledger persisted as plain JSON files.
///
/// Writes are serialised through an internal lock so concurrent appends from
/// one process never interleave lines.
pub struct FsTrajectoryLedger {
    sessions_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FsTrajectoryLedger {
    /// Create a ledger rooted at `root`. Creates `root/sessions/` if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let sessions_dir = root.as_ref().join("sessions");
        tokio::fs::create_dir_all(&sessions_dir).await?;
        Ok(Self {
            sessions_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the files of one session.
    pub fn session_dir(&self, session_id: &SessionId) -> PathBuf {
        self.sessions_dir.join(&session_id.0)
    }

    async fn read_record(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        let path = self.session_dir(session_id).join(RECORD_FILE);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::SessionNotFound {
                    session_id: session_id.0.clone(),
                }
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_record(&self, record: &SessionRecord) -> StorageResult<()> {
        let dir = self.session_dir(&record.session_id);
        let path = dir.join(RECORD_FILE);
        let tmp = dir.join(format!("{RECORD_FILE}.tmp"));
        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn finish(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
        summary: SessionSummary,
    ) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.read_record(session_id).await?;
        record.finish(status, summary)?;
        self.write_record(&record).await
    }
}

#[async_trait]
impl TrajectoryLedger for FsTrajectoryLedger {
    async fn create_session(&self, metadata: SessionMetadata) -> StorageResult<SessionId> {
        let _guard = self.write_lock.lock().await;
        let session_id = SessionId::new();
        let dir = self.session_dir(&session_id);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(ENTRIES_FILE), b"").await?;
        self.write_record(&SessionRecord::new(session_id.clone(), metadata))
            .await?;
        debug!(session_id = %session_id, dir = %dir.display(), "created session directory");
        Ok(session_id)
    }

    async fn append_entry(
        &self,
        session_id: &SessionId,
        entry: TrajectoryEntry,
    ) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.read_record(session_id).await?;
        record.ensure_running()?;
        record.accept_seq(entry.seq)?;

        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(self.session_dir(session_id).join(ENTRIES_FILE))
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        self.write_record(&record).await
    }

    async fn complete_session(
        &self,
        session_id: &SessionId,
        summary: SessionSummary,
    ) -> StorageResult<()> {
        self.finish(session_id, SessionStatus::Completed, summary)
            .await
    }

    async fn abort_session(
        &self,
        session_id: &SessionId,
        summary: SessionSummary,
    ) -> StorageResult<()> {
        self.finish(session_id, SessionStatus::Aborted, summary).await
    }

    async fn cancel_session(
        &self,
        session_id: &SessionId,
        summary: SessionSummary,
    ) -> StorageResult<()> {
        self.finish(session_id, SessionStatus::Cancelled, summary)
            .await
    }

    async fn get_session(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        self.read_record(session_id).await
    }

    async fn get_entries(&self, session_id: &SessionId) -> StorageResult<Vec<TrajectoryEntry>> {
        // Surface SessionNotFound before touching the entries file.
        self.read_record(session_id).await?;
        let raw = tokio::fs::read_to_string(self.session_dir(session_id).join(ENTRIES_FILE)).await?;
        let mut entries = raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str::<TrajectoryEntry>)
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.seq);
        Ok(entries)
    }

    async fn list_sessions(&self, team_name: Option<&str>) -> StorageResult<Vec<SessionRecord>> {
        let mut records = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.sessions_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path().join(RECORD_FILE);
            let bytes = match tokio::fs::read(&path).await {
                Ok(b) => b,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::Io(e)),
            };
            let record: SessionRecord = serde_json::from_slice(&bytes)?;
            if team_name.map_or(true, |t| record.metadata.team_name == t) {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn metadata() -> SessionMetadata {
        SessionMetadata {
            team_name: "pair".to_string(),
            participants: vec!["driver".to_string(), "navigator".to_string()],
            tags: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn entries_file_holds_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FsTrajectoryLedger::new(dir.path()).await.unwrap();
        let id = ledger.create_session(metadata()).await.unwrap();

        for seq in [1u64, 3] {
            ledger
                .append_entry(
                    &id,
                    TrajectoryEntry {
                        seq,
                        author: "driver".to_string(),
                        kind: "tool_call".to_string(),
                        payload: serde_json::json!({ "seq": seq }),
                        timestamp: Utc::now(),
                    },
                )
                .await
                .unwrap();
        }

        let raw = std::fs::read_to_string(ledger.session_dir(&id).join(ENTRIES_FILE)).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert_eq!(ledger.get_session(&id).await.unwrap().last_seq, Some(3));
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FsTrajectoryLedger::new(dir.path()).await.unwrap();
        let err = ledger
            .get_entries(&SessionId("nope".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::SessionNotFound { .. }));
    }
}
