//! SHA-256 digests for campaign files.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::{AppError, Result};

/// Algorithm tag prepended to every digest.
pub const DIGEST_PREFIX: &str = "sha256:";

const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the `sha256:<hex>` digest of a file, reading it in chunks.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the path does not exist,
/// `AppError::InvalidArgument` if it is a directory,
/// `AppError::PermissionDenied` if it cannot be opened for reading, and
/// `AppError::Io` for other read failures.
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(AppError::NotFound(format!("file {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::InvalidArgument(format!(
            "{} is a directory, not a file",
            path.display()
        )));
    }

    let file = File::open(path).map_err(|err| AppError::from_io("cannot open", path, &err))?;
    checksum_reader(file).map_err(|err| AppError::from_io("cannot read", path, &err))
}

/// Compute the `sha256:<hex>` digest of everything `reader` yields.
///
/// # Errors
///
/// Propagates read failures from `reader`.
pub fn checksum_reader(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buf[..read]);
    }
    Ok(format!("{DIGEST_PREFIX}{:x}", hasher.finalize()))
}

/// Compute the `sha256:<hex>` digest of in-memory bytes.
#[must_use]
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{DIGEST_PREFIX}{:x}", hasher.finalize())
}
