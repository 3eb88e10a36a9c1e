/**
 * Error types shared by the renaming engine
 */

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why an underlying move or rename was refused by the file system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemFailure {
    PermissionDenied,
    CrossesDevices,
    TargetExists,
    NotFound,
    Other,
}

impl FilesystemFailure {
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => FilesystemFailure::PermissionDenied,
            io::ErrorKind::CrossesDevices => FilesystemFailure::CrossesDevices,
            io::ErrorKind::AlreadyExists => FilesystemFailure::TargetExists,
            io::ErrorKind::NotFound => FilesystemFailure::NotFound,
            _ => FilesystemFailure::Other,
        }
    }
}

impl std::fmt::Display for FilesystemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            FilesystemFailure::PermissionDenied => "permission denied",
            FilesystemFailure::CrossesDevices => "crosses devices",
            FilesystemFailure::TargetExists => "target exists",
            FilesystemFailure::NotFound => "not found",
            FilesystemFailure::Other => "i/o error",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Invalid path '{path}': {reason}")]
    Validation { path: PathBuf, reason: String },

    #[error("No datetime found in metadata of '{path}'")]
    MetadataMissing { path: PathBuf },

    #[error("Metadata unavailable for '{path}': {reason}")]
    MetadataUnavailable { path: PathBuf, reason: String },

    #[error("Failed to move '{from}' to '{to}' ({kind})")]
    Filesystem {
        from: PathBuf,
        to: PathBuf,
        kind: FilesystemFailure,
        #[source]
        source: io::Error,
    },

    #[error("Failed to list directory '{path}'")]
    Listing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open {} file(s): {reason}", paths.len())]
    OpenFailed { paths: Vec<PathBuf>, reason: String },

    #[error("Invalid filename template '{template}'")]
    InvalidTemplate { template: String },

    #[error("Timestamp {timestamp} shifted by {timeshift} is out of range")]
    TimestampOutOfRange { timestamp: String, timeshift: String },
}

impl RenameError {
    /// Wrap an I/O failure from a move, classifying it
    pub fn filesystem(from: impl Into<PathBuf>, to: impl Into<PathBuf>, source: io::Error) -> Self {
        RenameError::Filesystem {
            from: from.into(),
            to: to.into(),
            kind: FilesystemFailure::from_io(&source),
            source,
        }
    }

    pub fn validation(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        RenameError::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenameError>;
