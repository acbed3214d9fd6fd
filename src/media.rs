//! Media file handles, kind inference, and metadata probes.
//!
//! A [`MediaFile`] is an immutable handle to a path plus its inferred kind;
//! identity is the path. Metadata probes are intentionally forgiving: an
//! unreadable or undecodable file reports zeroed metadata rather than an
//! error, since metadata is only consumed by quality scoring.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Recognized image extensions (lowercase, without dot).
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

/// Recognized video extensions (lowercase, without dot).
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv"];

/// The kind of a media file, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image (jpg, jpeg, png, bmp, webp).
    Image,
    /// Video stream (mp4, mov, avi, mkv).
    Video,
}

impl MediaKind {
    /// Infer the media kind from a path's extension.
    ///
    /// Returns `None` for unrecognized extensions; such files never enter
    /// the pipeline.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// An immutable handle to a media file.
///
/// Never mutated after construction; two handles refer to the same file
/// exactly when their paths are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaFile {
    /// Path to the file.
    pub path: PathBuf,
    /// Inferred media kind.
    pub kind: MediaKind,
}

impl MediaFile {
    /// Create a handle for a path whose extension is a recognized media type.
    #[must_use]
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let kind = MediaKind::from_path(&path)?;
        Some(Self { path, kind })
    }

    /// Create a handle with an explicit kind.
    #[must_use]
    pub fn new(path: PathBuf, kind: MediaKind) -> Self {
        Self { path, kind }
    }
}

/// Image metadata used by quality scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageMeta {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// File size in bytes.
    pub bytes: u64,
}

/// Video metadata used by quality scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VideoMeta {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Duration in seconds, 0.0 when unknown.
    pub duration_secs: f64,
    /// File size in bytes.
    pub bytes: u64,
}

/// Read image dimensions and file size.
///
/// Unreadable or undecodable files report zeroed metadata.
#[must_use]
pub fn image_metadata(path: &Path) -> ImageMeta {
    let (width, height) = match image::image_dimensions(path) {
        Ok(dims) => dims,
        Err(e) => {
            log::debug!("No image dimensions for {}: {}", path.display(), e);
            (0, 0)
        }
    };
    ImageMeta {
        width,
        height,
        bytes: file_size(path),
    }
}

/// Probe whether an image carries EXIF metadata.
///
/// Used only as a scoring bonus; any failure reads as "no EXIF".
#[must_use]
pub fn has_exif(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut reader = BufReader::new(file);
    exif::Reader::new().read_from_container(&mut reader).is_ok()
}

/// File size in bytes, 0 when the file cannot be read.
#[must_use]
pub fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
