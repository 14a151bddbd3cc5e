//! Verified restoration of checkpoint archives.
//!
//! Restoring runs in three phases against a single open archive:
//! every member is read and checked against its recorded digest, existing
//! files in the target directory are detected and confirmed, and only
//! then are the verified bytes written. A digest mismatch or a declined
//! confirmation leaves the target directory untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span};
use zip::ZipArchive;

use super::archive::{metadata_from_archive, open_archive};
use super::checksum::checksum_bytes;
use super::paths::{ensure_dir, ensure_writable_dir, validate_member_name, write_atomic};
use super::{ProgressSink, METADATA_FILE};
use crate::campaign::is_ranks_file;
use crate::config::RenameTable;
use crate::models::CheckpointMetadata;
use crate::{AppError, Result};

/// Confirmation callback asked whether listed files may be overwritten.
pub type ConfirmOverwrite<'a> = &'a mut dyn FnMut(&[String]) -> bool;

/// Knobs for [`restore_checkpoint`].
#[derive(Default)]
pub struct RestoreOptions<'a> {
    /// Also restore the shared ranks file.
    pub restore_ranks: bool,
    /// Overwrite existing files without asking.
    pub skip_overwrite_check: bool,
    /// Historical-to-canonical filename translation for destinations.
    pub rename_table: Option<&'a RenameTable>,
    /// Asked before overwriting; `false` cancels the restore.
    pub confirm_overwrite: Option<ConfirmOverwrite<'a>>,
    /// Receives one update per written file.
    pub progress: Option<&'a mut dyn ProgressSink>,
}

impl<'a> RestoreOptions<'a> {
    /// Include or exclude the shared ranks file.
    #[must_use]
    pub fn with_ranks(mut self, restore_ranks: bool) -> Self {
        self.restore_ranks = restore_ranks;
        self
    }

    /// Overwrite existing files without confirmation.
    #[must_use]
    pub fn skip_overwrite_check(mut self) -> Self {
        self.skip_overwrite_check = true;
        self
    }

    /// Translate destination filenames through `table`.
    #[must_use]
    pub fn with_rename_table(mut self, table: &'a RenameTable) -> Self {
        self.rename_table = Some(table);
        self
    }

    /// Ask `confirm` before overwriting existing files.
    #[must_use]
    pub fn with_confirmation(mut self, confirm: ConfirmOverwrite<'a>) -> Self {
        self.confirm_overwrite = Some(confirm);
        self
    }

    /// Report per-file progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: &'a mut dyn ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Verify and extract a checkpoint archive into `target_dir`.
///
/// Returns the paths written, in archive-name order.
///
/// # Errors
///
/// - `AppError::NotFound` / `AppError::InvalidArgument` if the archive or
///   target directory is missing or has the wrong type.
/// - `AppError::PermissionDenied` if the target directory is not writable.
/// - `AppError::Validation` if the archive is not a ZIP, lacks valid
///   metadata, holds unsafe member names, or any member fails digest
///   verification. Nothing is written in this case.
/// - `AppError::Cancelled` if the overwrite confirmation is declined.
/// - `AppError::Conflict` if files would be overwritten and neither a
///   confirmation callback nor `skip_overwrite_check` was supplied.
/// - Any error returned by the progress sink.
pub fn restore_checkpoint(
    archive_path: &Path,
    target_dir: &Path,
    options: RestoreOptions<'_>,
) -> Result<Vec<PathBuf>> {
    let span = info_span!("restore_checkpoint", archive = %archive_path.display());
    let _guard = span.enter();

    let RestoreOptions {
        restore_ranks,
        skip_overwrite_check,
        rename_table,
        confirm_overwrite,
        mut progress,
    } = options;

    let mut archive = open_archive(archive_path)?;
    ensure_writable_dir(target_dir, "target")?;
    let metadata = metadata_from_archive(&mut archive, archive_path)?;

    let members = member_names(&archive, restore_ranks)?;
    ensure_recorded_files_present(&metadata, &members, restore_ranks)?;

    let verified = verify_members(&mut archive, &members, &metadata)?;

    let destinations = destinations(&members, rename_table)?;
    let conflicts = existing_files(target_dir, &destinations);
    let planned: Vec<(String, Vec<u8>)> = destinations
        .into_iter()
        .zip(verified.into_iter().map(|(_, content)| content))
        .collect();

    if !conflicts.is_empty() && !skip_overwrite_check {
        match confirm_overwrite {
            Some(confirm) => {
                if !confirm(conflicts.as_slice()) {
                    return Err(AppError::Cancelled(format!(
                        "restore declined; {} existing file(s) left untouched",
                        conflicts.len()
                    )));
                }
            }
            None => {
                return Err(AppError::Conflict(format!(
                    "restore would overwrite existing files: {}",
                    conflicts.join(", ")
                )));
            }
        }
    }

    let total = planned.len();
    let mut written = Vec::with_capacity(total);
    for (index, (destination, content)) in planned.iter().enumerate() {
        if let Some(sink) = progress.as_mut() {
            sink.report(&format!("Restoring {destination}"), index + 1, total)?;
        }
        let summary = write_atomic(target_dir, destination, content)?;
        debug!(file = %destination, bytes = summary.bytes_written, "file restored");
        written.push(summary.path);
    }

    info!(
        campaign = metadata.campaign_name(),
        target = %target_dir.display(),
        files = written.len(),
        "checkpoint restored"
    );

    Ok(written)
}

/// Files a restore would write that already exist in `target_dir`.
///
/// Names are reported after `rename_table` is applied, exactly as
/// [`restore_checkpoint`] would report them.
///
/// # Errors
///
/// Returns archive and directory errors as for [`restore_checkpoint`].
pub fn check_restore_conflicts(
    archive_path: &Path,
    target_dir: &Path,
    restore_ranks: bool,
    rename_table: Option<&RenameTable>,
) -> Result<Vec<String>> {
    let archive = open_archive(archive_path)?;
    ensure_dir(target_dir, "target")?;

    let members = member_names(&archive, restore_ranks)?;
    let destinations = destinations(&members, rename_table)?;
    Ok(existing_files(target_dir, &destinations))
}

/// Destination filename of each member, in member order.
///
/// Two members landing on the same destination would silently overwrite
/// one another, so that is rejected.
fn destinations(members: &[String], rename_table: Option<&RenameTable>) -> Result<Vec<String>> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    let mut destinations = Vec::with_capacity(members.len());

    for name in members {
        let destination = rename_table.map_or(name.as_str(), |t| t.destination_for(name));
        let destination = validate_member_name(destination)?;
        if let Some(previous) = seen.insert(destination, name) {
            return Err(AppError::Validation(format!(
                "archive members '{previous}' and '{name}' both restore to '{destination}'"
            )));
        }
        destinations.push(destination.to_owned());
    }

    Ok(destinations)
}

fn existing_files(target_dir: &Path, destinations: &[String]) -> Vec<String> {
    destinations
        .iter()
        .filter(|destination| target_dir.join(destination).exists())
        .cloned()
        .collect()
}

/// Sorted names of the file members to restore.
fn member_names(archive: &ZipArchive<File>, restore_ranks: bool) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for name in archive.file_names() {
        if name == METADATA_FILE || name.ends_with('/') {
            continue;
        }
        if !restore_ranks && is_ranks_file(name) {
            continue;
        }
        names.push(validate_member_name(name)?.to_owned());
    }
    names.sort();
    Ok(names)
}

fn ensure_recorded_files_present(
    metadata: &CheckpointMetadata,
    members: &[String],
    restore_ranks: bool,
) -> Result<()> {
    let present: BTreeSet<&str> = members.iter().map(String::as_str).collect();
    let missing: Vec<&str> = metadata
        .files()
        .keys()
        .map(String::as_str)
        .filter(|name| restore_ranks || !is_ranks_file(name))
        .filter(|name| !present.contains(name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "archive is missing recorded files: {}",
            missing.join(", ")
        )))
    }
}

/// Read every member and compare its digest with the recorded one.
fn verify_members(
    archive: &mut ZipArchive<File>,
    members: &[String],
    metadata: &CheckpointMetadata,
) -> Result<Vec<(String, Vec<u8>)>> {
    let mut verified = Vec::with_capacity(members.len());

    for name in members {
        let expected = metadata.files().get(name).ok_or_else(|| {
            AppError::Validation(format!("archive member '{name}' has no recorded checksum"))
        })?;

        let mut member = archive.by_name(name)?;
        let mut content = Vec::new();
        member.read_to_end(&mut content).map_err(|err| match err.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                AppError::Validation(format!("archive member '{name}' is corrupt: {err}"))
            }
            _ => AppError::Io(format!("cannot read archive member '{name}': {err}")),
        })?;

        let actual = checksum_bytes(&content);
        if &actual != expected {
            return Err(AppError::Validation(format!(
                "checksum mismatch for '{name}': expected {expected}, got {actual}"
            )));
        }

        verified.push((name.clone(), content));
    }

    Ok(verified)
}
