//! Archive member name validation and atomic file writes.
//!
//! Archive members must be bare filenames; anything carrying a directory
//! component, `..`, or a root is rejected before it can be joined onto a
//! target directory. Restored files are written through a temporary file
//! in the target directory and renamed into place, so a failed write
//! never leaves a truncated save file behind.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{AppError, Result};

/// Summary of a completed file write.
#[derive(Debug, Clone)]
pub struct WriteSummary {
    /// Path of the written file.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes_written: usize,
}

/// Validate that `name` is a single, plain filename.
///
/// # Errors
///
/// Returns `AppError::Validation` if the name is empty, contains a path
/// separator, or is `.`/`..`.
pub fn validate_member_name(name: &str) -> Result<&str> {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(AppError::Validation(format!(
            "archive member '{name}' is not a bare filename"
        )));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(AppError::Validation(format!(
            "archive member '{name}' is not a bare filename"
        ))),
    }
}

/// Check that `dir` exists and is a directory.
///
/// # Errors
///
/// Returns `AppError::NotFound` if it is missing and
/// `AppError::InvalidArgument` if it is not a directory.
pub fn ensure_dir(dir: &Path, role: &str) -> Result<()> {
    if !dir.exists() {
        return Err(AppError::NotFound(format!(
            "{role} directory {}",
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(AppError::InvalidArgument(format!(
            "{role} path {} is not a directory",
            dir.display()
        )));
    }
    Ok(())
}

/// Check that `dir` is an existing directory files can be created in.
///
/// Writability is probed by creating and dropping a temporary file.
///
/// # Errors
///
/// Returns the errors of [`ensure_dir`], plus `AppError::PermissionDenied`
/// if the directory is not writable.
pub fn ensure_writable_dir(dir: &Path, role: &str) -> Result<()> {
    ensure_dir(dir, role)?;
    NamedTempFile::new_in(dir)
        .map(drop)
        .map_err(|err| AppError::from_io(&format!("{role} directory is not writable:"), dir, &err))
}

/// Write `content` to `dir/name` via a temporary file and rename.
///
/// # Errors
///
/// Returns `AppError::Validation` if `name` is not a bare filename,
/// `AppError::PermissionDenied` if the directory or an existing file
/// blocks the write, and `AppError::Io` for other failures.
pub fn write_atomic(dir: &Path, name: &str, content: &[u8]) -> Result<WriteSummary> {
    let target = dir.join(validate_member_name(name)?);

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|err| AppError::from_io("failed to create temporary file in", dir, &err))?;

    tmp.write_all(content)
        .map_err(|err| AppError::from_io("failed to write temporary file for", &target, &err))?;

    tmp.persist(&target)
        .map_err(|err| AppError::from_io("failed to persist file to", &target, &err.error))?;

    Ok(WriteSummary {
        path: target,
        bytes_written: content.len(),
    })
}
