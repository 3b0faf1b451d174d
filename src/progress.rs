//! Progress snapshot contract for download batches.
//!
//! The download engine emits one [`ProgressSnapshot`] per completed group;
//! rendering (progress bar, IPC, logging) is the caller's concern. Any
//! `Fn(ProgressSnapshot)` closure is a valid sink.

use serde::{Deserialize, Serialize};

/// Aggregate state of a download batch after a group completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Number of records in the batch.
    pub total: usize,
    /// Records that reached a terminal outcome so far (successful + failed).
    pub downloaded: usize,
    /// Records downloaded successfully so far.
    pub successful: usize,
    /// Records that failed so far.
    pub failed: usize,
}

/// Receives periodic progress snapshots during a batch.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, snapshot: ProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressSnapshot) + Send + Sync,
{
    fn on_progress(&self, snapshot: ProgressSnapshot) {
        self(snapshot);
    }
}

/// Sink that discards all snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _snapshot: ProgressSnapshot) {}
}
