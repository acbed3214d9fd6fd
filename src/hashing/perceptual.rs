//! Perceptual similarity signatures.
//!
//! Images hash to a single 64-bit DCT-based perceptual hash; videos hash to
//! an ordered sequence of per-frame hashes sampled at evenly spaced indices.
//! Signatures are approximate by design: similarity is a continuous score in
//! `[0, 1]`, never an equality test.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use image_hasher::{HashAlg, HasherConfig};
use thiserror::Error;

use super::video::{FrameSource, VideoOpener};

/// Bits in a single perceptual hash.
pub const HASH_BITS: u32 = 64;

/// Edge length frames are downsampled to before hashing.
///
/// Aggressive reduction is a throughput choice; the DCT hash only looks at
/// low-frequency structure anyway.
const FRAME_EDGE: u32 = 128;

/// Errors that can occur during perceptual hashing.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// Failed to open or decode the image.
    #[error("Failed to decode image {path}: {source}")]
    Decode {
        /// Path of the undecodable image
        path: std::path::PathBuf,
        /// The underlying decode error
        #[source]
        source: image::ImageError,
    },
}

/// Approximate visual signature of a media file.
///
/// Length 1 for images, `sample_count` or fewer for videos. An empty
/// signature marks a file that could not be decoded; it compares as similar
/// to nothing, including another empty signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerceptualSignature(pub Vec<u64>);

impl PerceptualSignature {
    /// The invalid signature of an undecodable file.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Whether this signature carries no hashes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Similarity to another signature in `[0, 1]`.
    ///
    /// Hashes are aligned by position over the first `min(len1, len2)` pairs;
    /// the score is one minus the mean normalized Hamming distance, clamped
    /// at zero. Either side being empty yields 0.0.
    #[must_use]
    pub fn similarity(&self, other: &Self) -> f64 {
        if self.0.is_empty() || other.0.is_empty() {
            return 0.0;
        }
        let pairs = self.0.len().min(other.0.len());
        let distance: u32 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        let sim = 1.0 - f64::from(distance) / (f64::from(HASH_BITS) * pairs as f64);
        sim.max(0.0)
    }
}

/// Computes perceptual signatures for images and video frames.
pub struct PerceptualHasher {
    hasher: image_hasher::Hasher,
}

impl PerceptualHasher {
    /// Create a hasher producing 64-bit DCT-preprocessed hashes.
    #[must_use]
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_size(8, 8)
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .to_hasher();
        Self { hasher }
    }

    /// Compute the signature of an image file.
    pub fn hash_image(&self, path: &Path) -> Result<PerceptualSignature, PerceptualError> {
        let img = image::open(path).map_err(|source| PerceptualError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        // Normalize to RGB so grayscale and paletted inputs hash consistently.
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        Ok(PerceptualSignature(vec![self.hash_pixels(&rgb)]))
    }

    /// Compute the signature of a video by sampling evenly spaced frames.
    ///
    /// An unopenable stream or an unknown/zero frame count yields the empty
    /// signature. Individual frame decode failures are skipped; the hashes
    /// that did decode keep their index order.
    #[must_use]
    pub fn hash_video(
        &self,
        path: &Path,
        sample_count: usize,
        opener: &dyn VideoOpener,
    ) -> PerceptualSignature {
        let Some(mut source) = opener.open(path) else {
            log::debug!("Cannot open video stream: {}", path.display());
            return PerceptualSignature::empty();
        };
        self.hash_frames(&mut *source, sample_count)
    }

    /// Hash evenly spaced frames from an open frame source.
    #[must_use]
    pub fn hash_frames(
        &self,
        source: &mut dyn FrameSource,
        sample_count: usize,
    ) -> PerceptualSignature {
        let frame_count = source.frame_count();
        if frame_count <= 0 || sample_count == 0 {
            return PerceptualSignature::empty();
        }

        // Index 0 is always sampled; step spacing covers the rest of the
        // stream. sample_count == 1 degenerates to the first frame only.
        let step = (frame_count / sample_count as i64).max(1);
        let mut hashes = Vec::with_capacity(sample_count);
        let mut index = 0;
        while index < frame_count && hashes.len() < sample_count {
            if let Some(frame) = source.decode_frame(index) {
                hashes.push(self.hash_frame(&frame));
            }
            index += step;
        }

        PerceptualSignature(hashes)
    }

    /// Hash a single decoded frame, downsampling it first.
    #[must_use]
    pub fn hash_frame(&self, frame: &RgbImage) -> u64 {
        let small = image::imageops::resize(frame, FRAME_EDGE, FRAME_EDGE, FilterType::Triangle);
        self.hash_pixels(&DynamicImage::ImageRgb8(small))
    }

    fn hash_pixels(&self, img: &DynamicImage) -> u64 {
        let hash = self.hasher.hash_image(img);
        let mut bits = [0u8; 8];
        for (slot, byte) in bits.iter_mut().zip(hash.as_bytes()) {
            *slot = *byte;
        }
        u64::from_le_bytes(bits)
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}
