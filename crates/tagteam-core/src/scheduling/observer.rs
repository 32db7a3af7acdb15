//! Session lifecycle hooks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Result, Step};
use crate::obs;

use super::orchestrator::SessionReport;

/// Snapshot passed to `on_session_start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStarted {
    pub session_id: String,
    pub team_name: String,
    /// Participant names in rotation order.
    pub participants: Vec<String>,
    pub step_budget: Option<u64>,
}

/// Observer notified as a session progresses.
///
/// All hooks default to no-ops. An `Err` is logged and otherwise ignored.
#[async_trait]
pub trait SessionObserver: Send + Sync {
    async fn on_session_start(&self, _session: &SessionStarted) -> Result<()> {
        Ok(())
    }

    async fn on_step_recorded(&self, _step: &Step) -> Result<()> {
        Ok(())
    }

    async fn on_rotation(&self, _from: &str, _to: &str) -> Result<()> {
        Ok(())
    }

    async fn on_session_end(&self, _report: &SessionReport) -> Result<()> {
        Ok(())
    }
}

/// Observers in registration order.
#[derive(Default, Clone)]
pub(crate) struct ObserverSet {
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl ObserverSet {
    pub(crate) fn push(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub(crate) async fn session_start(&self, session: &SessionStarted) {
        for observer in &self.observers {
            if let Err(e) = observer.on_session_start(session).await {
                obs::emit_observer_error("on_session_start", &e);
            }
        }
    }

    pub(crate) async fn step_recorded(&self, step: &Step) {
        for observer in &self.observers {
            if let Err(e) = observer.on_step_recorded(step).await {
                obs::emit_observer_error("on_step_recorded", &e);
            }
        }
    }

    pub(crate) async fn rotation(&self, from: &str, to: &str) {
        for observer in &self.observers {
            if let Err(e) = observer.on_rotation(from, to).await {
                obs::emit_observer_error("on_rotation", &e);
            }
        }
    }

    pub(crate) async fn session_end(&self, report: &SessionReport) {
        for observer in &self.observers {
            if let Err(e) = observer.on_session_end(report).await {
                obs::emit_observer_error("on_session_end", &e);
            }
        }
    }
}
