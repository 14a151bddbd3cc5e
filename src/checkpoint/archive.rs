//! Opening checkpoint archives and reading their metadata.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use super::METADATA_FILE;
use crate::models::CheckpointMetadata;
use crate::{AppError, Result};

/// Open `path` as a ZIP container.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the path does not exist,
/// `AppError::InvalidArgument` if it is a directory,
/// `AppError::PermissionDenied` if it cannot be opened, and
/// `AppError::Validation` if it is not a ZIP archive.
pub fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    if !path.exists() {
        return Err(AppError::NotFound(format!("archive {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::InvalidArgument(format!(
            "{} is a directory, not an archive",
            path.display()
        )));
    }

    let file = File::open(path).map_err(|err| AppError::from_io("cannot open archive", path, &err))?;
    ZipArchive::new(file).map_err(|err| {
        AppError::Validation(format!(
            "{} is not a valid checkpoint archive: {err}",
            path.display()
        ))
    })
}

/// Read and validate `metadata.json` from an open archive.
///
/// # Errors
///
/// Returns `AppError::Validation` if the member is missing, is not UTF-8,
/// or fails [`CheckpointMetadata::from_json`].
pub fn metadata_from_archive(archive: &mut ZipArchive<File>, path: &Path) -> Result<CheckpointMetadata> {
    let mut member = archive.by_name(METADATA_FILE).map_err(|err| match err {
        ZipError::FileNotFound => AppError::Validation(format!(
            "archive {} has no {METADATA_FILE}",
            path.display()
        )),
        other => AppError::from(other),
    })?;

    let mut raw = String::new();
    member.read_to_string(&mut raw).map_err(|err| {
        AppError::Validation(format!(
            "cannot read {METADATA_FILE} from {}: {err}",
            path.display()
        ))
    })?;

    CheckpointMetadata::from_json(&raw)
}

/// Read the metadata of the archive at `path` without extracting it.
///
/// # Errors
///
/// Returns the errors of [`open_archive`] and [`metadata_from_archive`].
pub fn read_metadata(path: &Path) -> Result<CheckpointMetadata> {
    let mut archive = open_archive(path)?;
    metadata_from_archive(&mut archive, path)
}
