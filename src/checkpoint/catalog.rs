//! Listing and deletion of checkpoint archives.

use std::fs;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use tracing::{info, warn};

use super::archive::read_metadata;
use super::ARCHIVE_EXTENSION;
use crate::models::{CheckpointMetadata, CheckpointSummary};
use crate::{AppError, Result};

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// How [`delete_checkpoint`] decides whether to go ahead.
pub enum DeletePolicy<'a> {
    /// Delete without asking.
    Force,
    /// Ask the callback with the archive's metadata; `false` keeps the file.
    Confirm(&'a mut dyn FnMut(&CheckpointMetadata) -> bool),
}

/// Human-readable size in binary units with one decimal place.
///
/// `1536` renders as `1.5 KB`; anything of 1024 GB or more is shown in TB.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Display only; one decimal place.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in SIZE_UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

/// Scan `dir` for checkpoint archives, most recent first.
///
/// Archives without readable, complete metadata are skipped with a
/// warning. `server_filter` and `campaign_filter` match case-insensitively.
/// A directory that does not exist yields an empty list.
///
/// # Errors
///
/// Returns `AppError::InvalidArgument` if `dir` is not a directory and
/// `AppError::Io` if it cannot be scanned.
pub fn list_checkpoints(
    dir: &Path,
    server_filter: Option<&str>,
    campaign_filter: Option<&str>,
) -> Result<Vec<CheckpointSummary>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(AppError::InvalidArgument(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let pattern = format!(
        "{}/*.{ARCHIVE_EXTENSION}",
        Pattern::escape(&dir.to_string_lossy())
    );
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let paths = glob::glob_with(&pattern, options)
        .map_err(|err| AppError::Io(format!("invalid scan pattern {pattern}: {err}")))?;

    let mut summaries = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!(%err, "skipping unreadable catalog entry");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }

        let metadata = match read_metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping invalid checkpoint");
                continue;
            }
        };

        if server_filter.is_some_and(|s| !s.eq_ignore_ascii_case(metadata.server_name())) {
            continue;
        }
        if campaign_filter.is_some_and(|c| !c.eq_ignore_ascii_case(metadata.campaign_name())) {
            continue;
        }

        let size = match fs::metadata(&path) {
            Ok(stat) => stat.len(),
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping checkpoint without file size");
                continue;
            }
        };

        summaries.push(CheckpointSummary {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            campaign: metadata.campaign_name().to_owned(),
            server: metadata.server_name().to_owned(),
            created_at: metadata.created_at(),
            size,
            size_human: format_size(size),
            name: metadata.name().map(ToOwned::to_owned),
            comment: metadata.comment().map(ToOwned::to_owned),
            files: metadata.files().clone(),
            path,
        });
    }

    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(summaries)
}

/// Delete the checkpoint archive at `path`.
///
/// The archive is validated before anything happens: it must exist, be a
/// ZIP and carry complete metadata. With [`DeletePolicy::Confirm`] a
/// negative answer returns `Ok(None)` and keeps the file. On success the
/// deleted archive's metadata is returned.
///
/// # Errors
///
/// - `AppError::NotFound` / `AppError::InvalidArgument` if the path is
///   missing or a directory.
/// - `AppError::Validation` if the archive or its metadata is invalid.
/// - `AppError::PermissionDenied` if the file cannot be removed, and
///   `AppError::Io` for other removal failures.
pub fn delete_checkpoint(
    path: &Path,
    policy: DeletePolicy<'_>,
) -> Result<Option<CheckpointMetadata>> {
    let metadata = read_metadata(path)?;

    if let DeletePolicy::Confirm(confirm) = policy {
        if !confirm(&metadata) {
            info!(archive = %path.display(), "checkpoint deletion declined");
            return Ok(None);
        }
    }

    fs::remove_file(path).map_err(|err| AppError::from_io("cannot delete", path, &err))?;

    info!(
        archive = %path.display(),
        campaign = metadata.campaign_name(),
        "checkpoint deleted"
    );

    Ok(Some(metadata))
}
