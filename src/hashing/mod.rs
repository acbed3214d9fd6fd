//! Hashing stages of the detection pipeline.
//!
//! Three progressively more expensive signatures, each gating the next:
//! - [`fingerprint`]: size plus boundary-content hashes, a cheap pre-filter
//! - [`content`]: streaming BLAKE3 digest of the full file, authoritative
//! - [`perceptual`]: 64-bit visual hash (one per image, a sampled sequence
//!   per video), compared by normalized Hamming distance
//!
//! Every primitive returns a `Result`; callers treat failures as soft and
//! drop the file from the current stage rather than aborting the run.

pub mod content;
pub mod fingerprint;
pub mod perceptual;
pub mod video;

use std::path::PathBuf;

pub use content::{digest_file, ContentDigest};
pub use fingerprint::{fingerprint_file, Fingerprint, BOUNDARY_SIZE};
pub use perceptual::{PerceptualHasher, PerceptualSignature};

/// Errors that can occur while reading a file for hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    pub(crate) fn from_io(path: &std::path::Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}
