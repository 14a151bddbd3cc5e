//! Fire-and-forget observers notified after checkpoint operations.
//!
//! Provides the [`CheckpointObserver`] trait and [`notify_observers`],
//! which shields the calling operation from observer failures. The
//! bundled implementation, [`JsonlEventWriter`], appends JSONL records to
//! daily-rotating files.

pub mod writer;

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Result;

pub use writer::JsonlEventWriter;

/// Kind of operation an event reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointEventKind {
    /// A checkpoint archive was written.
    Saved,
    /// A checkpoint was restored into a server directory.
    Restored,
    /// A checkpoint archive was deleted.
    Deleted,
    /// A foreign backup directory was imported.
    Imported,
}

/// A completed checkpoint operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointEvent {
    /// When the operation finished.
    pub timestamp: DateTime<Utc>,
    /// Operation kind.
    pub kind: CheckpointEventKind,
    /// Campaign identifier.
    pub campaign: String,
    /// Server name.
    pub server: String,
    /// Archive involved.
    pub archive: PathBuf,
    /// Number of campaign files written or archived.
    pub files: usize,
}

impl CheckpointEvent {
    /// Construct an event stamped with the current time.
    #[must_use]
    pub fn new(
        kind: CheckpointEventKind,
        campaign: impl Into<String>,
        server: impl Into<String>,
        archive: PathBuf,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            campaign: campaign.into(),
            server: server.into(),
            archive,
            files: 0,
        }
    }

    /// Set the file count for this event.
    #[must_use]
    pub fn with_files(mut self, files: usize) -> Self {
        self.files = files;
        self
    }
}

/// Receives events after checkpoint operations complete.
pub trait CheckpointObserver: Send + Sync {
    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Errors are logged and discarded by [`notify_observers`].
    fn on_event(&self, event: &CheckpointEvent) -> Result<()>;
}

/// Deliver `event` to every observer.
///
/// Observer errors and panics are logged and dropped; they never reach
/// the operation that produced the event.
pub fn notify_observers(observers: &[Box<dyn CheckpointObserver>], event: &CheckpointEvent) {
    for observer in observers {
        match panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(kind = ?event.kind, %err, "checkpoint observer failed"),
            Err(_) => warn!(kind = ?event.kind, "checkpoint observer panicked"),
        }
    }
}
