//! In-memory runtime fake for tests and dry runs.
//!
//! `ScriptedRuntime` maps a call key (the `command` argument, or the tool
//! name when there is none) to a canned result and records every call.
//! Unknown keys succeed with `ran <key>`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::collaborators::{ExecutionReport, Runtime, RuntimeError};
use crate::domain::{ToolCall, ToolExecutionError};

#[derive(Debug, Default)]
struct RuntimeState {
    canned: HashMap<String, Result<ExecutionReport, RuntimeError>>,
    calls: Vec<ToolCall>,
}

#[derive(Debug, Default)]
pub struct ScriptedRuntime {
    state: Mutex<RuntimeState>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with(self, key: &str, result: Result<ExecutionReport, RuntimeError>) -> Self {
        self.lock().canned.insert(key.to_string(), result);
        self
    }

    /// Succeed with `observation` whenever `key` runs.
    pub fn respond(self, key: &str, observation: &str) -> Self {
        self.with(key, Ok(ExecutionReport::observed(observation)))
    }

    /// Fail with a recoverable execution error whenever `key` runs.
    pub fn fail_on(self, key: &str, error: ToolExecutionError) -> Self {
        self.with(key, Err(RuntimeError::Execution(error)))
    }

    /// Report the task resolved whenever `key` runs.
    pub fn resolve_on(self, key: &str, submission: Option<&str>) -> Self {
        self.with(
            key,
            Ok(ExecutionReport::resolved(
                "task resolved",
                submission.map(str::to_string),
            )),
        )
    }

    /// Behave as if the backing environment went away whenever `key` runs.
    pub fn unavailable_on(self, key: &str) -> Self {
        self.with(
            key,
            Err(RuntimeError::Unavailable("container stopped".to_string())),
        )
    }

    /// Every call executed so far.
    pub fn calls(&self) -> Vec<ToolCall> {
        self.lock().calls.clone()
    }

    fn key(call: &ToolCall) -> String {
        call.command()
            .map(str::to_string)
            .unwrap_or_else(|| call.name.clone())
    }
}

#[async_trait]
impl Runtime for ScriptedRuntime {
    async fn execute(&self, call: &ToolCall) -> Result<ExecutionReport, RuntimeError> {
        let key = Self::key(call);
        let mut state = self.lock();
        state.calls.push(call.clone());
        state
            .canned
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Ok(ExecutionReport::observed(format!("ran {key}"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn canned_results_are_keyed_by_command_or_name() {
        let runtime = ScriptedRuntime::new()
            .respond("ls", "src\ntests")
            .resolve_on("submit", Some("diff"));

        let ls = ToolCall::new("bash", json!({ "command": "ls" }));
        assert_eq!(runtime.execute(&ls).await.unwrap().observation, "src\ntests");

        let submit = ToolCall::new("submit", json!({}));
        let report = runtime.execute(&submit).await.unwrap();
        assert!(report.resolved);
        assert_eq!(report.submission.as_deref(), Some("diff"));

        let other = ToolCall::new("bash", json!({ "command": "pwd" }));
        assert_eq!(runtime.execute(&other).await.unwrap().observation, "ran pwd");
        assert_eq!(runtime.calls().len(), 3);
    }
}
