//! Turn scheduling and control transfer.
//!
//! Control flows down this list on every iteration, then back up to the
//! orchestrator for the rotation decision.
//!
//! # Module layout
//!
//! - [`orchestrator`]: `TeamOrchestrator`, `SessionReport`
//! - [`allocator`]: `allocate`, the per-step retry cap
//! - [`adapter`]: `AgentAdapter`, the retry loop around one policy
//! - [`signal`]: `ControlSignal`, `classify`, `parse_raw_action`
//! - [`mirror`]: `mirror_step`, `propagate`
//! - [`question`]: `resolve_target`, `PendingQuestion`
//! - [`control`]: `SessionControl`, external resolve/cancel signals
//! - [`observer`]: `SessionObserver` lifecycle hooks

pub mod adapter;
pub mod allocator;
pub mod control;
pub mod mirror;
pub mod observer;
pub mod orchestrator;
pub mod question;
pub mod signal;

pub use adapter::{AgentAdapter, Resolution, TurnResult};
pub use allocator::allocate;
pub use control::SessionControl;
pub use mirror::{mirror_step, propagate};
pub use observer::{SessionObserver, SessionStarted};
pub use orchestrator::{SessionReport, TeamOrchestrator};
pub use question::{resolve_target, PendingQuestion};
pub use signal::{classify, classify_for, parse_raw_action, ControlSignal};
