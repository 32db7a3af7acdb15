//! tagteam-state: trajectory persistence for tagteam sessions
//!
//! Every step a team records is appended to a [`TrajectoryLedger`] so that a
//! session can be inspected after the fact, including failed attempts.
//!
//! ## Key Components
//!
//! - `TrajectoryLedger`: async, backend-agnostic session/entry persistence
//! - `MemoryTrajectoryLedger`: in-memory fake for tests and dry runs
//! - `FsTrajectoryLedger`: JSON files on local disk
//! - `ContentDigest`: SHA-256 digests for integrity-checked artifacts

mod error;
pub mod fakes;
pub mod fs_ledger;
pub mod storage_traits;

pub use error::StorageError;
pub use fakes::MemoryTrajectoryLedger;
pub use fs_ledger::FsTrajectoryLedger;
pub use storage_traits::{
    ContentDigest, SessionId, SessionMetadata, SessionRecord, SessionStatus, SessionSummary,
    StorageResult, TrajectoryEntry, TrajectoryLedger,
};
