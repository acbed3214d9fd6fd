//! Streaming BLAKE3 content digests.
//!
//! The content digest is the authoritative signal in the pipeline: two files
//! with equal digests are treated as bit-identical. Files are streamed in
//! bounded chunks so arbitrarily large media never has to fit in memory.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::HashError;

/// Read buffer size for streaming digests.
const CHUNK_SIZE: usize = 64 * 1024;

/// 256-bit cryptographic digest of a file's complete content.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    /// Hexadecimal rendering of the digest.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute the BLAKE3 digest of a file's full content.
///
/// Streams the file in 64KiB chunks. I/O failures are soft from the
/// pipeline's perspective; the caller excludes the file for this run.
pub fn digest_file(path: &Path) -> Result<ContentDigest, HashError> {
    let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| HashError::from_io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(ContentDigest(*hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_identical_content_identical_digest() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        assert_eq!(digest_file(&a).unwrap(), digest_file(&b).unwrap());
    }

    #[test]
    fn test_single_byte_difference_changes_digest() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, b"same bytes!").unwrap();
        std::fs::write(&b, b"same bytes?").unwrap();

        assert_ne!(digest_file(&a).unwrap(), digest_file(&b).unwrap());
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        // Multi-chunk file must produce the same digest as hashing in one go.
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let content: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let mut f = File::create(&path).unwrap();
        f.write_all(&content).unwrap();

        let streamed = digest_file(&path).unwrap();
        assert_eq!(streamed.0, *blake3::hash(&content).as_bytes());
    }

    #[test]
    fn test_digest_hex_roundtrip_length() {
        let digest = ContentDigest([0xab; 32]);
        assert_eq!(digest.to_hex().len(), 64);
        assert!(digest.to_hex().starts_with("abab"));
    }

    #[test]
    fn test_missing_file_is_soft_error() {
        assert!(digest_file(Path::new("/nonexistent/file.bin")).is_err());
    }
}
