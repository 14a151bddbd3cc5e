//! Checkpoint archive lifecycle.
//!
//! A checkpoint is a single deflate ZIP holding a campaign's save files
//! under their bare filenames plus a `metadata.json` document recording a
//! SHA-256 digest for each of them. [`builder`] writes archives,
//! [`save`] and [`import`] feed it from a server directory, [`restorer`]
//! verifies and extracts them, and [`catalog`] lists and deletes them.

use chrono::{DateTime, Utc};

use crate::Result;

pub mod archive;
pub mod builder;
pub mod catalog;
pub mod checksum;
pub mod import;
pub mod paths;
pub mod restorer;
pub mod save;

pub use archive::read_metadata;
pub use builder::{archive_filename, create_checkpoint};
pub use catalog::{delete_checkpoint, format_size, list_checkpoints, DeletePolicy};
pub use checksum::compute_file_checksum;
pub use import::{import_checkpoint, ImportReport};
pub use restorer::{check_restore_conflicts, restore_checkpoint, RestoreOptions};
pub use save::{save_all_campaigns, save_checkpoint};

/// Name of the metadata member inside every archive.
pub const METADATA_FILE: &str = "metadata.json";

/// Extension of checkpoint archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Receives progress updates from long-running operations.
///
/// Returning an error aborts the operation; the error is propagated to
/// the caller unchanged.
pub trait ProgressSink {
    /// Report that `stage` is at step `current` of `total`.
    ///
    /// # Errors
    ///
    /// Any error aborts the running operation.
    fn report(&mut self, stage: &str, current: usize, total: usize) -> Result<()>;
}

impl<F> ProgressSink for F
where
    F: FnMut(&str, usize, usize) -> Result<()>,
{
    fn report(&mut self, stage: &str, current: usize, total: usize) -> Result<()> {
        self(stage, current, total)
    }
}

/// Progress sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _stage: &str, _current: usize, _total: usize) -> Result<()> {
        Ok(())
    }
}

/// Operator-facing details attached to a new checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointLabel {
    /// Creation time; `None` means now.
    pub created_at: Option<DateTime<Utc>>,
    /// Optional short name.
    pub name: Option<String>,
    /// Optional free-text comment.
    pub comment: Option<String>,
}

impl CheckpointLabel {
    /// Pin the creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Set the checkpoint name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the checkpoint comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Resolve the creation time, defaulting to now.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or_else(Utc::now)
    }
}
