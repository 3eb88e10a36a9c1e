/**
 * File operations module: moving entries and listing directories
 */

use log::debug;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{RenameError, Result};

/// True when anything (file, directory, dangling symlink) occupies `path`
pub fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Move `source_path` to `target_path` without ever replacing an existing entry.
///
/// `fs::rename` silently overwrites files on Unix, so an occupied target is
/// reported as `TargetExists` before the move is attempted.
pub fn move_entry(source_path: &Path, target_path: &Path) -> Result<()> {
    debug!("Attempting move: '{}' -> '{}'", source_path.display(), target_path.display());

    if !entry_exists(source_path) {
        return Err(RenameError::filesystem(
            source_path,
            target_path,
            io::Error::new(io::ErrorKind::NotFound, "source does not exist"),
        ));
    }

    if entry_exists(target_path) {
        return Err(RenameError::filesystem(
            source_path,
            target_path,
            io::Error::new(io::ErrorKind::AlreadyExists, "target already exists"),
        ));
    }

    fs::rename(source_path, target_path)
        .map_err(|e| RenameError::filesystem(source_path, target_path, e))?;

    debug!("Move successful");
    Ok(())
}

/// Regular files directly inside `directory`, sorted by file name
pub fn list_files(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(RenameError::Listing {
            path: directory.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut files = Vec::new();

    let walker = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| RenameError::Listing {
            path: directory.to_path_buf(),
            source: io::Error::from(e),
        })?;

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Absolute form of `path` with `.` and `..` folded away lexically.
///
/// Symlinks are not resolved, so `link/..` folds to the directory holding
/// `link`, not to the target's parent.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| RenameError::validation(path, e.to_string()))?;

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if normalized.file_name().is_some() {
                    normalized.pop();
                }
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}
