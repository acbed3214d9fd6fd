//! Relocation of resolved duplicates into a quarantine area.
//!
//! Duplicates are never deleted; they are moved under a duplicates directory
//! so every resolution is reversible by hand even after the undo history has
//! rolled off.

use std::fs;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while relocating a file.
#[derive(Debug, Error)]
pub enum MoveError {
    /// The source file does not exist.
    #[error("Cannot move missing file: {0}")]
    Missing(PathBuf),

    /// An I/O error occurred during the move.
    #[error("Failed to move {path}: {source}")]
    Io {
        /// Path being moved when the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Moves duplicates out of the collection and back during undo.
pub trait DuplicateMover: Send + Sync {
    /// Move a file into the duplicates area, returning its new path.
    fn move_out(&self, source: &Path) -> Result<PathBuf, MoveError>;

    /// Move a previously relocated file back to its original path.
    fn move_back(&self, from: &Path, to: &Path) -> Result<(), MoveError>;
}

/// The duplicates directory a resolution run moves files into.
///
/// Destinations preserve the source path relative to the common prefix of
/// the source and the area root, so siblings from different directories do
/// not collide on file name alone. Sources sharing no prefix with the root
/// fall back to their file name.
#[derive(Debug, Clone)]
pub struct DuplicatesArea {
    root: PathBuf,
}

impl DuplicatesArea {
    /// Create an area rooted at the given directory.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The area's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The destination a source would be moved to.
    #[must_use]
    pub fn destination_for(&self, source: &Path) -> PathBuf {
        let relative = match common_prefix(source, &self.root) {
            Some(prefix) => source
                .strip_prefix(&prefix)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| fallback_name(source)),
            None => fallback_name(source),
        };
        unique_destination(self.root.join(relative))
    }
}

impl DuplicateMover for DuplicatesArea {
    fn move_out(&self, source: &Path) -> Result<PathBuf, MoveError> {
        if !source.is_file() {
            return Err(MoveError::Missing(source.to_path_buf()));
        }
        let destination = self.destination_for(source);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| MoveError::Io {
                path: destination.clone(),
                source: e,
            })?;
        }
        relocate(source, &destination)?;
        log::info!("Moved {} -> {}", source.display(), destination.display());
        Ok(destination)
    }

    fn move_back(&self, from: &Path, to: &Path) -> Result<(), MoveError> {
        if !from.is_file() {
            return Err(MoveError::Missing(from.to_path_buf()));
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| MoveError::Io {
                path: to.to_path_buf(),
                source: e,
            })?;
        }
        relocate(from, to)?;
        log::info!("Restored {} -> {}", from.display(), to.display());
        Ok(())
    }
}

/// Rename, falling back to copy+remove for cross-device moves.
fn relocate(from: &Path, to: &Path) -> Result<(), MoveError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(|e| MoveError::Io {
        path: from.to_path_buf(),
        source: e,
    })?;
    fs::remove_file(from).map_err(|e| MoveError::Io {
        path: from.to_path_buf(),
        source: e,
    })
}

/// Longest shared ancestor of two paths, if any.
fn common_prefix(a: &Path, b: &Path) -> Option<PathBuf> {
    let mut prefix = PathBuf::new();
    let mut matched = false;
    for (ca, cb) in a.components().zip(b.components()) {
        if ca != cb {
            break;
        }
        if !matches!(ca, Component::RootDir | Component::Prefix(_)) {
            matched = true;
        }
        prefix.push(ca.as_os_str());
    }
    matched.then_some(prefix)
}

fn fallback_name(source: &Path) -> PathBuf {
    source
        .file_name()
        .map_or_else(|| PathBuf::from("unnamed"), PathBuf::from)
}

/// Suffix the file stem until the destination is free.
fn unique_destination(candidate: PathBuf) -> PathBuf {
    if !candidate.exists() {
        return candidate;
    }
    let stem = candidate
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    let ext = candidate
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()));
    let parent = candidate.parent().map_or_else(PathBuf::new, Path::to_path_buf);

    for n in 1.. {
        let name = match &ext {
            Some(ext) => format!("{}_{}{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        let next = parent.join(name);
        if !next.exists() {
            return next;
        }
    }
    unreachable!()
}
