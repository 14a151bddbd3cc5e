//! Catalog listing record for a checkpoint archive.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One archive found by a catalog scan.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CheckpointSummary {
    /// Archive filename without directory.
    pub filename: String,
    /// Full path to the archive.
    pub path: PathBuf,
    /// Campaign identifier from metadata.
    pub campaign: String,
    /// Server name from metadata.
    pub server: String,
    /// Creation time from metadata.
    pub created_at: DateTime<Utc>,
    /// Archive size on disk in bytes.
    pub size: u64,
    /// Archive size in binary units, e.g. `1.5 KB`.
    pub size_human: String,
    /// Optional operator-supplied name.
    pub name: Option<String>,
    /// Optional operator-supplied comment.
    pub comment: Option<String>,
    /// Archived filename to digest.
    pub files: BTreeMap<String, String>,
}
