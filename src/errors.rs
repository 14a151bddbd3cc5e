//! Error types shared across the crate.

use std::fmt::{Display, Formatter};
use std::io;
use std::path::Path;

/// Shared crate result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error enumeration covering every checkpoint failure mode.
#[derive(Debug)]
pub enum AppError {
    /// File, directory, archive, server or configuration is absent.
    NotFound(String),
    /// Path has the wrong type (file where a directory is expected, or
    /// the reverse) or an argument is unusable.
    InvalidArgument(String),
    /// Malformed metadata, missing required fields, digest mismatch or
    /// invalid metadata values.
    Validation(String),
    /// Read, write or delete blocked by filesystem permissions.
    PermissionDenied(String),
    /// The operator declined a confirmation.
    Cancelled(String),
    /// No campaign files match the request, or the target already exists.
    Conflict(String),
    /// Configuration parsing or validation failure.
    Config(String),
    /// Any other file-system or I/O failure.
    Io(String),
}

impl AppError {
    /// Classify an I/O error, keeping not-found and permission failures
    /// distinct from generic I/O errors.
    #[must_use]
    pub fn from_io(context: &str, path: &Path, err: &io::Error) -> Self {
        let msg = format!("{context} {}: {err}", path.display());
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(msg),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(msg),
            _ => Self::Io(msg),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Validation(msg) => write!(f, "validation failed: {msg}"),
            Self::PermissionDenied(msg) => write!(f, "permission denied: {msg}"),
            Self::Cancelled(msg) => write!(f, "cancelled: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io_err) => match io_err.kind() {
                io::ErrorKind::PermissionDenied => Self::PermissionDenied(io_err.to_string()),
                _ => Self::Io(format!("archive i/o: {io_err}")),
            },
            zip::result::ZipError::FileNotFound => {
                Self::Validation("archive member not found".into())
            }
            other => Self::Validation(format!("invalid archive: {other}")),
        }
    }
}
