//! Local process runtime.
//!
//! Runs `bash` tool calls through `sh -c` with a per-call timeout. The
//! working directory persists across calls, so `cd` in one step carries
//! over to the next. A `submit` call resolves the task.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

use crate::collaborators::{ExecutionReport, Runtime, RuntimeError};
use crate::domain::{ToolCall, ToolExecutionError};
use crate::scheduling::signal::SHELL_TOOL;

pub const SUBMIT_TOOL: &str = "submit";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const CWD_MARKER: &str = "__TAGTEAM_CWD__";

pub struct ProcessRuntime {
    cwd: Mutex<PathBuf>,
    timeout: Duration,
}

impl ProcessRuntime {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            cwd: Mutex::new(workdir.into()),
            timeout,
        }
    }

    /// Current working directory for the next command.
    pub async fn cwd(&self) -> PathBuf {
        self.cwd.lock().await.clone()
    }

    async fn run_shell(&self, command: &str) -> Result<ExecutionReport, RuntimeError> {
        let mut cwd = self.cwd.lock().await;
        let script = format!(
            "{command}\n__tagteam_status=$?\nprintf '\\n{CWD_MARKER}%s\\n' \"$PWD\"\nexit $__tagteam_status\n"
        );

        let child = Command::new("sh")
            .arg("-c")
            .arg(&script)
            .current_dir(cwd.as_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RuntimeError::Unavailable(format!("failed to spawn sh: {e}")))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                RuntimeError::Execution(ToolExecutionError {
                    tool: SHELL_TOOL.to_string(),
                    detail: format!("timed out after {}s", self.timeout.as_secs_f64()),
                })
            })?
            .map_err(|e| RuntimeError::Unavailable(format!("failed to wait for sh: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let (body, reported_cwd) = split_cwd(&stdout);
        if let Some(dir) = reported_cwd {
            *cwd = dir;
        }

        let mut observation = body.trim_end().to_string();
        if !stderr.trim().is_empty() {
            if !observation.is_empty() {
                observation.push('\n');
            }
            observation.push_str(stderr.trim_end());
        }
        debug!(command = %command, status = ?output.status.code(), cwd = %cwd.display(), "shell command finished");

        if output.status.success() {
            return Ok(ExecutionReport::observed(observation));
        }
        let status = output
            .status
            .code()
            .map_or_else(|| "killed by signal".to_string(), |c| format!("exit status {c}"));
        Err(RuntimeError::Execution(ToolExecutionError {
            tool: SHELL_TOOL.to_string(),
            detail: if observation.is_empty() {
                status
            } else {
                format!("{status}\n{observation}")
            },
        }))
    }
}

/// Split the trailing cwd report off command output.
fn split_cwd(stdout: &str) -> (&str, Option<PathBuf>) {
    let Some(at) = stdout.rfind(CWD_MARKER) else {
        return (stdout, None);
    };
    let dir = stdout[at + CWD_MARKER.len()..].trim();
    let body = stdout[..at].strip_suffix('\n').unwrap_or(&stdout[..at]);
    let dir = (!dir.is_empty()).then(|| Path::new(dir).to_path_buf());
    (body, dir)
}

#[async_trait]
impl Runtime for ProcessRuntime {
    async fn execute(&self, call: &ToolCall) -> Result<ExecutionReport, RuntimeError> {
        if call.name.eq_ignore_ascii_case(SUBMIT_TOOL) {
            let submission = call.str_arg("submission").map(str::to_string);
            return Ok(ExecutionReport::resolved("submission recorded", submission));
        }
        if !call.name.eq_ignore_ascii_case(SHELL_TOOL) {
            return Err(RuntimeError::Execution(ToolExecutionError {
                tool: call.name.clone(),
                detail: format!("unknown tool; available: {SHELL_TOOL}, {SUBMIT_TOOL}"),
            }));
        }
        let command = call.command().map(str::trim).unwrap_or_default();
        if command.is_empty() {
            return Err(RuntimeError::Execution(ToolExecutionError {
                tool: call.name.clone(),
                detail: "missing `command` argument".to_string(),
            }));
        }
        self.run_shell(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bash(command: &str) -> ToolCall {
        ToolCall::new("bash", json!({ "command": command }))
    }

    fn runtime(dir: &Path) -> ProcessRuntime {
        ProcessRuntime::new(dir, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let report = runtime(dir.path())
            .execute(&bash("echo hello"))
            .await
            .unwrap();
        assert_eq!(report.observation, "hello");
        assert!(!report.resolved);
    }

    #[tokio::test]
    async fn working_directory_persists() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime(dir.path());
        rt.execute(&bash("mkdir sub && cd sub")).await.unwrap();
        assert!(rt.cwd().await.ends_with("sub"));

        let report = rt.execute(&bash("touch marker && ls")).await.unwrap();
        assert_eq!(report.observation, "marker");
        assert!(dir.path().join("sub").join("marker").exists());
    }

    #[tokio::test]
    async fn non_zero_exit_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = runtime(dir.path())
            .execute(&bash("echo oops >&2; exit 3"))
            .await
            .unwrap_err();
        let RuntimeError::Execution(e) = err else {
            panic!("expected execution error");
        };
        assert!(e.detail.starts_with("exit status 3"));
        assert!(e.detail.contains("oops"));
    }

    #[tokio::test]
    async fn timeout_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let rt = ProcessRuntime::new(dir.path(), Duration::from_millis(200));
        let err = rt.execute(&bash("sleep 5")).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Execution(_)));
    }

    #[tokio::test]
    async fn submit_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let call = ToolCall::new("submit", json!({ "submission": "fixed" }));
        let report = runtime(dir.path()).execute(&call).await.unwrap();
        assert!(report.resolved);
        assert_eq!(report.submission.as_deref(), Some("fixed"));
    }

    #[tokio::test]
    async fn unknown_tool_and_missing_command_fail() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime(dir.path());
        assert!(rt
            .execute(&ToolCall::new("browser", json!({})))
            .await
            .is_err());
        assert!(rt.execute(&ToolCall::new("bash", json!({}))).await.is_err());
    }

    #[test]
    fn split_cwd_handles_missing_marker() {
        assert_eq!(split_cwd("plain"), ("plain", None));
        let (body, dir) = split_cwd("out\n\n__TAGTEAM_CWD__/tmp/x\n");
        assert_eq!(body, "out\n");
        assert_eq!(dir, Some(PathBuf::from("/tmp/x")));
    }
}
