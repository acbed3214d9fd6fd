//! The staged clustering pipeline.
//!
//! Detection narrows candidates through progressively more expensive stages:
//! fingerprints pre-filter on the I/O pool, content digests confirm exact
//! duplicates for fingerprint-collision groups, and perceptual signatures
//! (one representative per exact group, on the CPU pool) catch near-duplicate
//! re-encodes. Pairwise similarity judgments are merged with union-find into
//! the final clusters.
//!
//! Images and videos are clustered independently; a photo never compares
//! against a clip even when their hashes happen to land close.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hashing::video::{default_opener, VideoOpener};
use crate::hashing::{digest_file, fingerprint_file, ContentDigest, Fingerprint};
use crate::hashing::{PerceptualHasher, PerceptualSignature};
use crate::media::{MediaFile, MediaKind};
use crate::progress::ProgressCallback;
use crate::scheduler::{Scheduler, Workload};

use super::union_find::UnionFind;

/// Similarity threshold for fully automatic handling.
pub const HIGH_THRESHOLD: f64 = 0.95;

/// Similarity threshold for review-assisted handling.
pub const LOW_THRESHOLD: f64 = 0.85;

/// Default number of frames sampled per video.
pub const DEFAULT_SAMPLE_COUNT: usize = 20;

/// Errors that can occur while clustering.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The similarity threshold falls outside `[0, 1]`.
    #[error("Similarity threshold must be in [0, 1], got {0}")]
    InvalidThreshold(f64),
}

/// Identity a file clusters under after the exact stages.
///
/// Files whose fingerprint collided with another file's get the content
/// digest as their key; files with a unique fingerprint skip the digest
/// stage and get a synthetic per-path key instead. Ordering exists so exact
/// groups can be iterated deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExactKey {
    /// Content digest shared by every bit-identical copy.
    Digest(ContentDigest),
    /// Per-path key for a file no other file collides with.
    Synthetic(PathBuf),
}

/// One duplicate cluster: files judged to be copies or near-copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// The media kind every member shares.
    pub kind: MediaKind,
    /// Member paths, exact groups kept adjacent.
    pub files: Vec<PathBuf>,
}

/// Counters describing one clustering run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStats {
    /// Files that entered the pipeline.
    pub total_files: usize,
    /// Files dropped because their fingerprint could not be read.
    pub fingerprint_failures: usize,
    /// Files whose fingerprint matched no other file.
    pub unique_fingerprints: usize,
    /// Fingerprint-collision groups that went to the digest stage.
    pub fingerprint_groups: usize,
    /// Files dropped because their content digest could not be read.
    pub digest_failures: usize,
    /// Exact groups entering the perceptual stage.
    pub exact_groups: usize,
    /// Representatives whose perceptual signature could not be computed.
    pub signature_failures: usize,
    /// Clusters produced.
    pub clusters: usize,
    /// Files across all produced clusters.
    pub clustered_files: usize,
}

impl ClusterStats {
    fn absorb(&mut self, other: &ClusterStats) {
        self.total_files += other.total_files;
        self.fingerprint_failures += other.fingerprint_failures;
        self.unique_fingerprints += other.unique_fingerprints;
        self.fingerprint_groups += other.fingerprint_groups;
        self.digest_failures += other.digest_failures;
        self.exact_groups += other.exact_groups;
        self.signature_failures += other.signature_failures;
        self.clusters += other.clusters;
        self.clustered_files += other.clustered_files;
    }
}

/// Configuration for a clustering run.
#[derive(Clone)]
pub struct ClusterConfig {
    /// Similarity threshold in `[0, 1]` for merging exact groups.
    pub threshold: f64,
    /// Frames sampled per video.
    pub sample_count: usize,
    /// I/O pool size override.
    pub io_threads: Option<usize>,
    /// CPU pool size override.
    pub cpu_threads: Option<usize>,
    /// Progress callback for the hashing stages.
    pub progress: Option<Arc<dyn ProgressCallback>>,
    /// Video decoding backend.
    pub opener: Arc<dyn VideoOpener>,
}

impl std::fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("threshold", &self.threshold)
            .field("sample_count", &self.sample_count)
            .field("io_threads", &self.io_threads)
            .field("cpu_threads", &self.cpu_threads)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            threshold: HIGH_THRESHOLD,
            sample_count: DEFAULT_SAMPLE_COUNT,
            io_threads: None,
            cpu_threads: None,
            progress: None,
            opener: default_opener(),
        }
    }
}

impl ClusterConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the similarity threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the number of frames sampled per video.
    #[must_use]
    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Override the I/O pool thread count.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = Some(threads);
        self
    }

    /// Override the CPU pool thread count.
    #[must_use]
    pub fn with_cpu_threads(mut self, threads: usize) -> Self {
        self.cpu_threads = Some(threads);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Set the video decoding backend.
    #[must_use]
    pub fn with_opener(mut self, opener: Arc<dyn VideoOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Validate the configuration.
    ///
    /// Rejected configurations do no work at all.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if !(0.0..=1.0).contains(&self.threshold) || self.threshold.is_nan() {
            return Err(ClusterError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }

    fn scheduler(&self) -> Scheduler {
        let mut scheduler = Scheduler::new();
        if let Some(threads) = self.io_threads {
            scheduler = scheduler.with_io_threads(threads);
        }
        if let Some(threads) = self.cpu_threads {
            scheduler = scheduler.with_cpu_threads(threads);
        }
        if let Some(ref progress) = self.progress {
            scheduler = scheduler.with_progress(progress.clone());
        }
        scheduler
    }
}

/// Run the fingerprint and digest stages, producing sorted exact groups.
///
/// Every returned group's member list is path-sorted; the map iterates in
/// key order, so downstream stages see a deterministic sequence regardless
/// of worker scheduling. Files whose fingerprint or digest fails are dropped
/// from the run and counted in `stats`.
pub fn exact_groups(
    paths: Vec<PathBuf>,
    scheduler: &Scheduler,
    stats: &mut ClusterStats,
) -> BTreeMap<ExactKey, Vec<PathBuf>> {
    let total = paths.len();
    let fingerprints = scheduler.map(Workload::Io, "fingerprint", paths, |path| {
        match fingerprint_file(path) {
            Ok(fp) => Some(fp),
            Err(e) => {
                log::warn!("Skipping unreadable file: {}", e);
                None
            }
        }
    });
    stats.fingerprint_failures += total - fingerprints.len();

    let mut by_fingerprint: HashMap<Fingerprint, Vec<PathBuf>> = HashMap::new();
    for (path, fp) in fingerprints {
        by_fingerprint.entry(fp).or_default().push(path);
    }

    let mut groups: BTreeMap<ExactKey, Vec<PathBuf>> = BTreeMap::new();
    let mut collision_paths = Vec::new();
    for (_, members) in by_fingerprint {
        if members.len() == 1 {
            let path = members.into_iter().next().unwrap();
            stats.unique_fingerprints += 1;
            groups.insert(ExactKey::Synthetic(path.clone()), vec![path]);
        } else {
            stats.fingerprint_groups += 1;
            collision_paths.extend(members);
        }
    }

    let digest_total = collision_paths.len();
    let digests = scheduler.map(Workload::Io, "digest", collision_paths, |path| {
        match digest_file(path) {
            Ok(digest) => Some(digest),
            Err(e) => {
                log::warn!("Skipping undigestable file: {}", e);
                None
            }
        }
    });
    stats.digest_failures += digest_total - digests.len();

    for (path, digest) in digests {
        groups.entry(ExactKey::Digest(digest)).or_default().push(path);
    }
    for members in groups.values_mut() {
        members.sort();
    }
    stats.exact_groups += groups.len();

    groups
}

/// One representative path per exact group, path-sorted.
///
/// Each group's members are bit-identical (or a singleton), so any member
/// stands in for the group perceptually; the first sorted member is chosen
/// for determinism.
#[must_use]
pub fn representatives(groups: &BTreeMap<ExactKey, Vec<PathBuf>>) -> Vec<PathBuf> {
    let mut reps: Vec<PathBuf> = groups
        .values()
        .filter_map(|members| members.first().cloned())
        .collect();
    reps.sort();
    reps
}

/// Merge exact groups whose representatives look alike.
///
/// Exact-group members are unioned with their group's first member, then
/// every representative pair is compared in ascending path order and unioned
/// at `similarity >= threshold`. Representatives with an empty or missing
/// signature match nothing, whatever the threshold.
#[must_use]
pub fn merge_groups(
    groups: &BTreeMap<ExactKey, Vec<PathBuf>>,
    signatures: &HashMap<PathBuf, PerceptualSignature>,
    threshold: f64,
) -> UnionFind<PathBuf> {
    let mut uf = UnionFind::new();

    for members in groups.values() {
        if let Some((first, rest)) = members.split_first() {
            for member in rest {
                uf.union(first, member);
            }
        }
    }

    let reps = representatives(groups);
    for i in 0..reps.len() {
        let Some(sig_i) = signatures.get(&reps[i]).filter(|s| !s.is_empty()) else {
            continue;
        };
        for rep_j in &reps[i + 1..] {
            let Some(sig_j) = signatures.get(rep_j).filter(|s| !s.is_empty()) else {
                continue;
            };
            if sig_i.similarity(sig_j) >= threshold {
                uf.union(&reps[i], rep_j);
            }
        }
    }

    uf
}

/// Accumulate exact groups into clusters by equivalence root.
///
/// A group joins a cluster only if its representative was registered in the
/// union-find; roots that end up with fewer than two files are discarded.
#[must_use]
pub fn collect_clusters(
    groups: &BTreeMap<ExactKey, Vec<PathBuf>>,
    uf: &mut UnionFind<PathBuf>,
    kind: MediaKind,
) -> Vec<Cluster> {
    let mut by_root: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for members in groups.values() {
        let Some(rep) = members.first() else {
            continue;
        };
        if !uf.contains(rep) {
            continue;
        }
        let root = uf.find(rep);
        by_root.entry(root).or_default().extend(members.iter().cloned());
    }

    let mut clusters: Vec<Cluster> = by_root
        .into_values()
        .filter(|files| files.len() >= 2)
        .map(|files| Cluster { kind, files })
        .collect();
    clusters.sort_by(|a, b| a.files.first().cmp(&b.files.first()));
    clusters
}

/// Cluster the files of a single media kind.
pub fn cluster_kind(
    paths: Vec<PathBuf>,
    kind: MediaKind,
    config: &ClusterConfig,
    scheduler: &Scheduler,
) -> (Vec<Cluster>, ClusterStats) {
    let mut stats = ClusterStats {
        total_files: paths.len(),
        ..ClusterStats::default()
    };
    if paths.is_empty() {
        return (Vec::new(), stats);
    }
    log::info!("Clustering {} {} file(s)", paths.len(), kind);

    let groups = exact_groups(paths, scheduler, &mut stats);
    let reps = representatives(&groups);
    let rep_total = reps.len();

    let sample_count = config.sample_count;
    let opener = config.opener.clone();
    let signatures = scheduler.map(Workload::Cpu, "perceptual", reps, |path| {
        let hasher = PerceptualHasher::new();
        match kind {
            MediaKind::Image => match hasher.hash_image(path) {
                Ok(sig) => Some(sig),
                Err(e) => {
                    log::warn!("Skipping unhashable image: {}", e);
                    None
                }
            },
            MediaKind::Video => Some(hasher.hash_video(path, sample_count, opener.as_ref())),
        }
    });
    stats.signature_failures += rep_total - signatures.len()
        + signatures.values().filter(|s| s.is_empty()).count();

    let mut uf = merge_groups(&groups, &signatures, config.threshold);
    let clusters = collect_clusters(&groups, &mut uf, kind);

    stats.clusters = clusters.len();
    stats.clustered_files = clusters.iter().map(|c| c.files.len()).sum();
    log::info!(
        "Found {} {} cluster(s) covering {} file(s)",
        stats.clusters,
        kind,
        stats.clustered_files
    );

    (clusters, stats)
}

/// Cluster a collection of media files into duplicate groups.
///
/// Images and videos are clustered independently and the results
/// concatenated, images first. Returns the clusters along with run counters.
pub fn cluster_all(
    files: Vec<MediaFile>,
    config: &ClusterConfig,
) -> Result<(Vec<Cluster>, ClusterStats), ClusterError> {
    config.validate()?;
    let scheduler = config.scheduler();

    let mut images = Vec::new();
    let mut videos = Vec::new();
    for file in files {
        match file.kind {
            MediaKind::Image => images.push(file.path),
            MediaKind::Video => videos.push(file.path),
        }
    }

    let (mut clusters, mut stats) = cluster_kind(images, MediaKind::Image, config, &scheduler);
    let (video_clusters, video_stats) =
        cluster_kind(videos, MediaKind::Video, config, &scheduler);
    clusters.extend(video_clusters);
    stats.absorb(&video_stats);

    Ok((clusters, stats))
}
