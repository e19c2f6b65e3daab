//! Filesystem utilities.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::resolver::GetError;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), GetError> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| {
            GetError::io(format!("failed to remove directory: {}", path.display()), e)
        })?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<(), GetError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            GetError::io(format!("failed to create directory: {}", path.display()), e)
        })?;
    }
    Ok(())
}

/// Walk up from `path` to the first directory that exists, stopping at `boundary`.
///
/// Returns `None` when nothing below `boundary` exists.
pub fn nearest_existing_dir(path: &Path, boundary: &Path) -> Option<PathBuf> {
    let mut current = path.to_path_buf();
    while current.starts_with(boundary) && current != boundary {
        if current.is_dir() {
            return Some(current);
        }
        if !current.pop() {
            break;
        }
    }
    None
}

/// Render a relative path with `/` separators, as import paths use.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
