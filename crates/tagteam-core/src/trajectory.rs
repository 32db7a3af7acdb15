//! Self-contained, integrity-checked trajectory files.
//!
//! A [`TrajectoryArtifact`] holds every recorded step of a session plus each
//! participant's full history (retry entries included), so a run can be
//! inspected without the ledger that produced it.
//!
//! Artifacts are written to `<dir>/<session_id>/trajectory.json` with a
//! companion `<dir>/<session_id>/trajectory.digest` file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tagteam_state::ContentDigest;

use crate::domain::{History, Result, Step, TeamError};
use crate::scheduling::orchestrator::SessionReport;

const ARTIFACT_FILE: &str = "trajectory.json";
const DIGEST_FILE: &str = "trajectory.digest";

/// Session outcome block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryInfo {
    pub exit_status: String,
    pub submission: Option<String>,
    pub total_steps: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryArtifact {
    pub session_id: String,
    pub team_name: String,
    pub created_at: DateTime<Utc>,
    pub info: TrajectoryInfo,
    /// Recorded steps in sequence order.
    pub steps: Vec<Step>,
    /// Every participant's history in rotation order.
    pub histories: Vec<History>,
    /// SHA-256 hex digest of `serde_json::to_vec(&(&steps, &histories))`.
    pub digest: String,
}

fn content_digest(steps: &[Step], histories: &[History]) -> Result<String> {
    let bytes = serde_json::to_vec(&(steps, histories))?;
    Ok(ContentDigest::from_bytes(&bytes).as_str().to_string())
}

impl TrajectoryArtifact {
    pub fn from_report(report: &SessionReport) -> Result<Self> {
        let digest = content_digest(&report.trajectory, &report.histories)?;
        Ok(Self {
            session_id: report.session_id.clone(),
            team_name: report.team_name.clone(),
            created_at: Utc::now(),
            info: TrajectoryInfo {
                exit_status: report.termination.to_string(),
                submission: report.submission.clone(),
                total_steps: report.state.global_step_count,
                duration_ms: report.duration_ms,
            },
            steps: report.trajectory.clone(),
            histories: report.histories.clone(),
            digest,
        })
    }

    /// Recorded steps per author, in name order.
    pub fn steps_by_author(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for step in &self.steps {
            *counts.entry(step.author.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Retry entries across all histories.
    pub fn retry_count(&self) -> usize {
        self.histories.iter().map(|h| h.retries().count()).sum()
    }
}

/// Write `artifact` under `dir`. Returns the path to `trajectory.json`.
pub fn write_trajectory_artifact(artifact: &TrajectoryArtifact, dir: &Path) -> Result<PathBuf> {
    let session_dir = dir.join(&artifact.session_id);
    std::fs::create_dir_all(&session_dir)?;

    let artifact_path = session_dir.join(ARTIFACT_FILE);
    let json = serde_json::to_vec_pretty(artifact)?;
    std::fs::write(&artifact_path, &json)?;
    std::fs::write(session_dir.join(DIGEST_FILE), artifact.digest.as_bytes())?;

    Ok(artifact_path)
}

/// Read and verify the artifact for `session_id` under `dir`.
///
/// Returns `TeamError::DigestMismatch` if the content no longer matches the
/// stored digest.
pub fn read_trajectory_artifact(session_id: &str, dir: &Path) -> Result<TrajectoryArtifact> {
    read_trajectory_file(&dir.join(session_id).join(ARTIFACT_FILE))
}

/// Read and verify an artifact from an explicit `trajectory.json` path.
pub fn read_trajectory_file(path: &Path) -> Result<TrajectoryArtifact> {
    let json = std::fs::read(path)?;
    let artifact: TrajectoryArtifact = serde_json::from_slice(&json)?;

    let actual = content_digest(&artifact.steps, &artifact.histories)?;
    if actual != artifact.digest {
        return Err(TeamError::DigestMismatch {
            expected: artifact.digest.clone(),
            actual,
        });
    }

    // The companion file must agree when present.
    if let Some(parent) = path.parent() {
        match std::fs::read_to_string(parent.join(DIGEST_FILE)) {
            Ok(stored) if stored.trim() != artifact.digest => {
                return Err(TeamError::DigestMismatch {
                    expected: stored.trim().to_string(),
                    actual: artifact.digest.clone(),
                })
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(TeamError::Io(e)),
        }
    }

    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, Outcome, SessionState, TerminationReason, ToolCall};
    use serde_json::json;
    use tempfile::tempdir;

    fn report() -> SessionReport {
        let step = Step {
            author: "driver".to_string(),
            sequence: 1,
            thought: None,
            action: Action::ToolCall(ToolCall::new("bash", json!({ "command": "ls" }))),
            outcome: Outcome::success("ran ls"),
            retry_index: 0,
            retry_budget_exhausted: false,
        };
        let mut state = SessionState::new(Some(1));
        state.global_step_count = 1;
        SessionReport {
            session_id: "session-1".to_string(),
            team_name: "pair".to_string(),
            termination: TerminationReason::StepBudgetExhausted,
            state,
            submission: None,
            trajectory: vec![step],
            histories: vec![History::new("driver"), History::new("navigator")],
            duration_ms: 3,
        }
    }

    #[test]
    fn write_then_read_verifies() {
        let dir = tempdir().unwrap();
        let artifact = TrajectoryArtifact::from_report(&report()).unwrap();
        let path = write_trajectory_artifact(&artifact, dir.path()).unwrap();
        assert!(path.ends_with("session-1/trajectory.json"));

        let loaded = read_trajectory_artifact("session-1", dir.path()).unwrap();
        assert_eq!(loaded.digest, artifact.digest);
        assert_eq!(loaded.info.exit_status, "step_budget_exhausted");
        assert_eq!(loaded.steps_by_author().get("driver"), Some(&1));
    }

    #[test]
    fn tampered_steps_fail_verification() {
        let dir = tempdir().unwrap();
        let mut artifact = TrajectoryArtifact::from_report(&report()).unwrap();
        artifact.steps[0].outcome = Outcome::success("forged");
        write_trajectory_artifact(&artifact, dir.path()).unwrap();

        let err = read_trajectory_artifact("session-1", dir.path()).unwrap_err();
        assert!(matches!(err, TeamError::DigestMismatch { .. }));
    }

    #[test]
    fn mismatched_companion_digest_fails() {
        let dir = tempdir().unwrap();
        let artifact = TrajectoryArtifact::from_report(&report()).unwrap();
        let path = write_trajectory_artifact(&artifact, dir.path()).unwrap();
        std::fs::write(path.with_file_name(DIGEST_FILE), "0".repeat(64)).unwrap();

        assert!(matches!(
            read_trajectory_file(&path),
            Err(TeamError::DigestMismatch { .. })
        ));
    }
}
