//! Structural file fingerprints.
//!
//! A [`Fingerprint`] is the cheapest signature in the pipeline: the byte size
//! plus BLAKE3 hashes of the first and last 64KiB. Files must share all three
//! before the full-content digest is worth computing. A collision is never
//! proof of duplication; two files with identical boundaries can still differ
//! in the middle, which the content digest stage catches.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::HashError;

/// Bytes hashed from each end of the file.
pub const BOUNDARY_SIZE: u64 = 64 * 1024;

/// Cheap structural signature: size plus boundary-content hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// File size in bytes.
    pub size: u64,
    /// BLAKE3 of the first 64KiB (or the whole file if smaller).
    pub head: [u8; 32],
    /// BLAKE3 of the last 64KiB (or the whole file if smaller).
    pub tail: [u8; 32],
}

impl Fingerprint {
    /// The sentinel fingerprint shared by all size-0 files.
    ///
    /// Empty files are bit-identical by definition, so routing them through
    /// the content-digest stage as one group is correct, not a false match.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            size: 0,
            head: [0u8; 32],
            tail: [0u8; 32],
        }
    }
}

/// Compute the fingerprint of a file.
///
/// Reads at most 128KiB regardless of file size. Size-0 files fingerprint to
/// the [`Fingerprint::empty`] sentinel without touching their content.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint, HashError> {
    let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| HashError::from_io(path, e))?
        .len();

    if size == 0 {
        return Ok(Fingerprint::empty());
    }

    let span = size.min(BOUNDARY_SIZE) as usize;
    let mut buf = vec![0u8; span];

    file.read_exact(&mut buf)
        .map_err(|e| HashError::from_io(path, e))?;
    let head = *blake3::hash(&buf).as_bytes();

    file.seek(SeekFrom::Start(size.saturating_sub(BOUNDARY_SIZE)))
        .map_err(|e| HashError::from_io(path, e))?;
    file.read_exact(&mut buf)
        .map_err(|e| HashError::from_io(path, e))?;
    let tail = *blake3::hash(&buf).as_bytes();

    Ok(Fingerprint { size, head, tail })
}
