//! Quality scoring for cluster members.
//!
//! The score orders a cluster so the member most worth keeping sorts first.
//! It is a heuristic, not a calibrated quantity: resolution only ever
//! compares scores within one cluster, so the units never need to agree
//! across kinds.

use std::path::Path;

use crate::hashing::video::VideoOpener;
use crate::media::{self, MediaKind};

/// Score bonus for images carrying EXIF metadata.
///
/// Originals tend to keep their camera metadata; re-encodes and messenger
/// downloads tend to lose it.
const EXIF_BONUS: f64 = 1000.0;

/// Weight of one second of duration against one pixel of area.
const DURATION_WEIGHT: f64 = 10.0;

/// Quality score of a single file; higher is better.
///
/// Images score `width * height + bytes + 1000 * exif_present`; videos score
/// `width * height + 10 * duration_secs + bytes`. Unreadable files score the
/// metadata they expose as zeros, which naturally sorts them last.
#[must_use]
pub fn quality_score(path: &Path, kind: MediaKind, opener: &dyn VideoOpener) -> f64 {
    match kind {
        MediaKind::Image => {
            let meta = media::image_metadata(path);
            let exif = if media::has_exif(path) { EXIF_BONUS } else { 0.0 };
            f64::from(meta.width) * f64::from(meta.height) + meta.bytes as f64 + exif
        }
        MediaKind::Video => {
            let probe = opener.probe(path).unwrap_or_default();
            let bytes = media::file_size(path) as f64;
            f64::from(probe.width) * f64::from(probe.height)
                + DURATION_WEIGHT * probe.duration_secs
                + bytes
        }
    }
}

/// Sort paths by descending quality score, ties broken by path.
///
/// The returned order is deterministic for a fixed set of files and
/// metadata; the first element is the member resolution keeps by default.
pub fn rank_by_quality(
    paths: &mut Vec<std::path::PathBuf>,
    kind: MediaKind,
    opener: &dyn VideoOpener,
) {
    let mut scored: Vec<(f64, std::path::PathBuf)> = paths
        .drain(..)
        .map(|p| (quality_score(&p, kind, opener), p))
        .collect();
    scored.sort_by(|(sa, pa), (sb, pb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| pa.cmp(pb))
    });
    paths.extend(scored.into_iter().map(|(_, p)| p));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::video::UnsupportedOpener;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_larger_image_scores_higher() {
        let dir = tempdir().unwrap();
        let big = dir.path().join("big.png");
        let small = dir.path().join("small.png");
        RgbImage::from_pixel(64, 64, Rgb([7, 7, 7])).save(&big).unwrap();
        RgbImage::from_pixel(8, 8, Rgb([7, 7, 7])).save(&small).unwrap();

        let opener = UnsupportedOpener;
        assert!(
            quality_score(&big, MediaKind::Image, &opener)
                > quality_score(&small, MediaKind::Image, &opener)
        );
    }

    #[test]
    fn test_unreadable_file_scores_bytes_only() {
        let opener = UnsupportedOpener;
        let score = quality_score(
            Path::new("/nonexistent/photo.jpg"),
            MediaKind::Image,
            &opener,
        );
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_unprobeable_video_scores_file_size() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, vec![0u8; 123]).unwrap();

        let opener = UnsupportedOpener;
        assert_eq!(quality_score(&clip, MediaKind::Video, &opener), 123.0);
    }

    #[test]
    fn test_rank_puts_best_first() {
        let dir = tempdir().unwrap();
        let big = dir.path().join("a_big.png");
        let small = dir.path().join("b_small.png");
        RgbImage::from_pixel(64, 64, Rgb([1, 1, 1])).save(&big).unwrap();
        RgbImage::from_pixel(8, 8, Rgb([1, 1, 1])).save(&small).unwrap();

        let mut paths = vec![small.clone(), big.clone()];
        rank_by_quality(&mut paths, MediaKind::Image, &UnsupportedOpener);
        assert_eq!(paths, vec![big, small]);
    }

    #[test]
    fn test_rank_ties_break_by_path() {
        let mut paths = vec![PathBuf::from("/z.jpg"), PathBuf::from("/a.jpg")];
        rank_by_quality(&mut paths, MediaKind::Image, &UnsupportedOpener);
        assert_eq!(paths, vec![PathBuf::from("/a.jpg"), PathBuf::from("/z.jpg")]);
    }
}
