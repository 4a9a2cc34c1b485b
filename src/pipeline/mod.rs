//! Polling pipeline.
//!
//! - `SnapshotDiffer`: windowed diff between two snapshots of a group
//! - `PollingCache`: previous snapshot per group
//! - `PollingScheduler`: the cycle loop tying fetch, diff and dispatch together

pub mod cache;
pub mod diff;
pub mod scheduler;

pub use cache::PollingCache;
pub use diff::{DiffWindow, SnapshotDiffer, diff_snapshots};
pub use scheduler::{CycleReport, PollingScheduler, Scheduler, next_cursor};
