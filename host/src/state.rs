//! ==============================================================================
//! state.rs - the shared latest-snapshot cell
//! ==============================================================================
//!
//! purpose:
//!     holds the single current Snapshot shared between:
//!     - the mqtt ingest task (writes a new snapshot per decoded message)
//!     - the web server (reads for the api and dashboard)
//!
//!     constructed once in main.rs and handed to both sides as Arc<SnapshotCell>.
//!
//! locking:
//!     one rwlock guards the whole snapshot. writers swap in a complete value,
//!     readers clone a complete value. nothing awaits while holding the guard,
//!     so neither side waits longer than a clone.
//!
//! ==============================================================================

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::domain::Snapshot;

pub struct SnapshotCell {
    current: RwLock<Snapshot>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

/// message counters reported by the health endpoint
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub messages_accepted: u64,
    pub messages_rejected: u64,
}

impl SnapshotCell {
    /// a cell holding the INITIALIZING sentinel
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Snapshot::initial()),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// overwrite the stored snapshot as one unit
    pub async fn replace(&self, snapshot: Snapshot) {
        let mut guard = self.current.write().await;
        *guard = snapshot;
        drop(guard);
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// copy of the stored snapshot
    pub async fn read(&self) -> Snapshot {
        self.current.read().await.clone()
    }

    /// note a payload that was dropped without touching the snapshot
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            messages_accepted: self.accepted.load(Ordering::Relaxed),
            messages_rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new()
    }
}
