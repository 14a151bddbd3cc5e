//! Checkpoint archive creation.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info, info_span};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::checksum::compute_file_checksum;
use super::paths::validate_member_name;
use super::{CheckpointLabel, ProgressSink, ARCHIVE_EXTENSION, METADATA_FILE};
use crate::models::CheckpointMetadata;
use crate::{AppError, Result};

/// Deterministic archive filename: `{campaign}_{YYYY-MM-DD_HH-MM-SS}.zip`.
#[must_use]
pub fn archive_filename(campaign_name: &str, created_at: DateTime<Utc>) -> String {
    format!(
        "{campaign_name}_{}.{ARCHIVE_EXTENSION}",
        created_at.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Build a checkpoint archive from `files` inside `output_dir`.
///
/// Every file is checksummed, then written into a new deflate archive
/// under its bare filename together with `metadata.json`. The archive is
/// assembled in a temporary file and only moved to its final name once
/// complete. `progress` receives one update per checksum and one when
/// archive writing starts.
///
/// # Errors
///
/// - `AppError::Validation` if the campaign or server name is empty.
/// - `AppError::NotFound` for the first input file that does not exist.
/// - `AppError::InvalidArgument` if an input is a directory or two inputs
///   share a filename.
/// - `AppError::Conflict` if the target archive already exists.
/// - `AppError::PermissionDenied` / `AppError::Io` on filesystem failures.
/// - Any error returned by `progress`.
pub fn create_checkpoint(
    campaign_name: &str,
    server_name: &str,
    files: &[PathBuf],
    output_dir: &Path,
    label: &CheckpointLabel,
    progress: &mut dyn ProgressSink,
) -> Result<PathBuf> {
    let span = info_span!("create_checkpoint", campaign = campaign_name, server = server_name);
    let _guard = span.enter();

    let created_at = label.timestamp();
    // Validate names before touching any file.
    CheckpointMetadata::new(
        campaign_name,
        server_name,
        created_at,
        BTreeMap::new(),
        None,
        None,
    )?;

    let entries = collect_entries(files)?;

    let total = entries.len();
    let mut digests = BTreeMap::new();
    for (index, (name, path)) in entries.iter().enumerate() {
        progress.report(&format!("Computing checksum for {name}"), index + 1, total)?;
        let digest = compute_file_checksum(path)?;
        debug!(file = %name, %digest, "checksum computed");
        digests.insert(name.clone(), digest);
    }

    let metadata = CheckpointMetadata::new(
        campaign_name,
        server_name,
        created_at,
        digests,
        label.name.clone(),
        label.comment.clone(),
    )?;

    fs::create_dir_all(output_dir)
        .map_err(|err| AppError::from_io("cannot create output directory", output_dir, &err))?;

    let filename = archive_filename(campaign_name, created_at);
    let archive_path = output_dir.join(validate_member_name(&filename)?);
    if archive_path.exists() {
        return Err(AppError::Conflict(format!(
            "archive {} already exists",
            archive_path.display()
        )));
    }

    progress.report("Creating archive", total, total)?;
    write_archive(&archive_path, output_dir, &entries, &metadata)?;

    info!(
        archive = %archive_path.display(),
        files = total,
        "checkpoint created"
    );

    Ok(archive_path)
}

/// Pair every input with its bare filename, validating existence and type.
fn collect_entries(files: &[PathBuf]) -> Result<Vec<(String, PathBuf)>> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(files.len());

    for path in files {
        if !path.exists() {
            return Err(AppError::NotFound(format!(
                "campaign file {}",
                path.display()
            )));
        }
        if path.is_dir() {
            return Err(AppError::InvalidArgument(format!(
                "{} is a directory, not a campaign file",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                AppError::InvalidArgument(format!("{} has no filename", path.display()))
            })?;
        if name == METADATA_FILE {
            return Err(AppError::InvalidArgument(format!(
                "'{METADATA_FILE}' is reserved for checkpoint metadata"
            )));
        }
        if !seen.insert(name.clone()) {
            return Err(AppError::InvalidArgument(format!(
                "duplicate filename '{name}' in checkpoint input"
            )));
        }
        entries.push((name, path.clone()));
    }

    Ok(entries)
}

fn write_archive(
    archive_path: &Path,
    output_dir: &Path,
    entries: &[(String, PathBuf)],
    metadata: &CheckpointMetadata,
) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(output_dir)
        .map_err(|err| AppError::from_io("failed to create temporary archive in", output_dir, &err))?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    {
        let mut zip = ZipWriter::new(tmp.as_file_mut());

        for (name, path) in entries {
            zip.start_file(name.as_str(), options)?;
            let mut source =
                File::open(path).map_err(|err| AppError::from_io("cannot open", path, &err))?;
            io::copy(&mut source, &mut zip)
                .map_err(|err| AppError::from_io("failed to archive", path, &err))?;
        }

        zip.start_file(METADATA_FILE, options)?;
        zip.write_all(metadata.to_json()?.as_bytes())
            .map_err(|err| AppError::Io(format!("failed to write {METADATA_FILE}: {err}")))?;

        zip.finish()?;
    }

    tmp.persist_noclobber(archive_path).map_err(|err| {
        if err.error.kind() == io::ErrorKind::AlreadyExists {
            AppError::Conflict(format!("archive {} already exists", archive_path.display()))
        } else {
            AppError::from_io("failed to persist archive to", archive_path, &err.error)
        }
    })?;

    Ok(())
}
