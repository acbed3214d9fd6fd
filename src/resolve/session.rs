//! The resolution session: walks clusters, applies decisions, tracks undo.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cluster::{Cluster, DEFAULT_SAMPLE_COUNT, HIGH_THRESHOLD};
use crate::hashing::video::{default_opener, VideoOpener};
use crate::hashing::{digest_file, PerceptualHasher, PerceptualSignature};
use crate::media::MediaKind;

use super::mover::{DuplicateMover, MoveError};
use super::score::rank_by_quality;
use super::source::{Decision, DecisionSource, ReviewPair};

/// Most recent resolution actions kept for undo.
pub const HISTORY_LIMIT: usize = 10;

/// Errors that can occur during resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The similarity threshold falls outside `[0, 1]`.
    #[error("Similarity threshold must be in [0, 1], got {0}")]
    InvalidThreshold(f64),

    /// A file move failed.
    #[error(transparent)]
    Move(#[from] MoveError),
}

/// Configuration for a resolution session.
#[derive(Clone)]
pub struct ResolveConfig {
    /// Similarity threshold a pair must reach before a decision is asked.
    pub threshold: f64,
    /// Frames sampled per video when re-checking similarity.
    pub sample_count: usize,
    /// Video decoding backend for similarity checks and scoring probes.
    pub opener: Arc<dyn VideoOpener>,
}

impl std::fmt::Debug for ResolveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveConfig")
            .field("threshold", &self.threshold)
            .field("sample_count", &self.sample_count)
            .finish()
    }
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            threshold: HIGH_THRESHOLD,
            sample_count: DEFAULT_SAMPLE_COUNT,
            opener: default_opener(),
        }
    }
}

impl ResolveConfig {
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

    /// Set the video decoding backend.
    #[must_use]
    pub fn with_opener(mut self, opener: Arc<dyn VideoOpener>) -> Self {
        self.opener = opener;
        self
    }

    fn validate(&self) -> Result<(), ResolveError> {
        if !(0.0..=1.0).contains(&self.threshold) || self.threshold.is_nan() {
            return Err(ResolveError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// One recorded resolution action.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// The decision that was applied.
    pub decision: Decision,
    /// Original path of the moved file, if one moved.
    pub moved_from: Option<PathBuf>,
    /// Where the moved file went, if one moved.
    pub moved_to: Option<PathBuf>,
    /// Cluster the action applied to.
    pub cluster_index: usize,
    /// The cluster's member list before the action.
    pub snapshot: Vec<PathBuf>,
}

/// Result of undoing the most recent action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoReport {
    /// The decision that was rolled back.
    pub decision: Decision,
    /// Whether the file move (if any) was reversed.
    ///
    /// False means the relocated file no longer exists or could not be moved
    /// back; the cluster state is still restored.
    pub restored: bool,
}

/// Counters describing one resolution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveStats {
    /// Clusters fully processed.
    pub clusters_processed: usize,
    /// Exact duplicates moved without asking a decision source.
    pub auto_moves: usize,
    /// Files moved on an explicit keep decision.
    pub decided_moves: usize,
    /// Pairs deferred by a skip decision.
    pub skipped_pairs: usize,
    /// Pairs released as not-duplicates by a keep-both decision.
    pub kept_both: usize,
    /// Pairs dropped because their similarity fell below the threshold.
    pub inconclusive_pairs: usize,
    /// Cluster members dropped because they no longer exist on disk.
    pub missing_files: usize,
    /// Whether a quit decision halted the run.
    pub halted: bool,
}

/// Walks duplicate clusters and resolves each down to one kept file.
///
/// A session owns its cluster list and a bounded undo history. `run` may be
/// called repeatedly: a run halted by [`Decision::Quit`] resumes at the same
/// cluster, and [`ResolveSession::undo`] rewinds the cursor to the affected
/// cluster.
pub struct ResolveSession {
    clusters: Vec<Cluster>,
    cursor: usize,
    history: VecDeque<HistoryEntry>,
    config: ResolveConfig,
    mover: Arc<dyn DuplicateMover>,
    hasher: PerceptualHasher,
}

impl ResolveSession {
    /// Create a session over the given clusters.
    ///
    /// The threshold is validated here, before any file is touched.
    pub fn new(
        clusters: Vec<Cluster>,
        config: ResolveConfig,
        mover: Arc<dyn DuplicateMover>,
    ) -> Result<Self, ResolveError> {
        config.validate()?;
        Ok(Self {
            clusters,
            cursor: 0,
            history: VecDeque::new(),
            config,
            mover,
            hasher: PerceptualHasher::new(),
        })
    }

    /// The current cluster list.
    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Index of the next cluster to resolve.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of undoable actions currently held.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Resolve clusters from the cursor onward.
    ///
    /// Stops early when the decision source quits; the cursor stays on the
    /// interrupted cluster so a subsequent `run` resumes there.
    pub fn run(&mut self, source: &mut dyn DecisionSource) -> Result<ResolveStats, ResolveError> {
        let mut stats = ResolveStats::default();
        while self.cursor < self.clusters.len() {
            let halted = self.resolve_cluster(self.cursor, source, &mut stats)?;
            if halted {
                stats.halted = true;
                log::info!("Resolution halted at cluster {}", self.cursor);
                return Ok(stats);
            }
            stats.clusters_processed += 1;
            self.cursor += 1;
        }
        log::info!(
            "Resolved {} cluster(s): {} automatic move(s), {} decided move(s)",
            stats.clusters_processed,
            stats.auto_moves,
            stats.decided_moves
        );
        Ok(stats)
    }

    /// Undo the most recent recorded action, if any.
    ///
    /// Restores the affected cluster's member list and rewinds the cursor to
    /// that cluster. The file move is reversed only when the relocated file
    /// still exists; a vanished file is reported through the returned
    /// [`UndoReport`], never as an error.
    pub fn undo(&mut self) -> Option<UndoReport> {
        let entry = self.history.pop_back()?;

        let restored = match (&entry.moved_to, &entry.moved_from) {
            (Some(current), Some(original)) => {
                if current.is_file() {
                    match self.mover.move_back(current, original) {
                        Ok(()) => true,
                        Err(e) => {
                            log::warn!("Undo could not restore file: {}", e);
                            false
                        }
                    }
                } else {
                    log::warn!(
                        "Undo target no longer exists: {}",
                        current.display()
                    );
                    false
                }
            }
            _ => true,
        };

        if let Some(cluster) = self.clusters.get_mut(entry.cluster_index) {
            cluster.files = entry.snapshot.clone();
        }
        self.cursor = entry.cluster_index;

        Some(UndoReport {
            decision: entry.decision,
            restored,
        })
    }

    fn resolve_cluster(
        &mut self,
        index: usize,
        source: &mut dyn DecisionSource,
        stats: &mut ResolveStats,
    ) -> Result<bool, ResolveError> {
        let kind = self.clusters[index].kind;
        let mut files = self.clusters[index].files.clone();
        rank_by_quality(&mut files, kind, self.config.opener.as_ref());
        self.clusters[index].files = files.clone();

        while files.len() >= 2 {
            let left = files[0].clone();
            let right = files[1].clone();

            if !left.is_file() || !right.is_file() {
                let before = files.len();
                files.retain(|p| p.is_file());
                stats.missing_files += before - files.len();
                self.clusters[index].files = files.clone();
                continue;
            }

            let exact = matches!(
                (digest_file(&left), digest_file(&right)),
                (Ok(a), Ok(b)) if a == b
            );
            if exact {
                let snapshot = files.clone();
                let destination = self.mover.move_out(&right)?;
                self.record(HistoryEntry {
                    decision: Decision::KeepLeft,
                    moved_from: Some(right),
                    moved_to: Some(destination),
                    cluster_index: index,
                    snapshot,
                });
                files.remove(1);
                self.clusters[index].files = files.clone();
                stats.auto_moves += 1;
                continue;
            }

            let similarity = self.pair_similarity(&left, &right, kind);
            if similarity < self.config.threshold {
                // Clustering already vouched for the pair; a miss here means
                // the files changed under us, so leave both alone.
                log::debug!(
                    "Pair below threshold ({:.3}): {} / {}",
                    similarity,
                    left.display(),
                    right.display()
                );
                files.remove(1);
                self.clusters[index].files = files.clone();
                stats.inconclusive_pairs += 1;
                continue;
            }

            let pair = ReviewPair {
                left: left.clone(),
                right: right.clone(),
                similarity,
                cluster_index: index,
            };
            match source.decide(&pair) {
                Decision::KeepLeft => {
                    let snapshot = files.clone();
                    let destination = self.mover.move_out(&right)?;
                    self.record(HistoryEntry {
                        decision: Decision::KeepLeft,
                        moved_from: Some(right),
                        moved_to: Some(destination),
                        cluster_index: index,
                        snapshot,
                    });
                    files.remove(1);
                    stats.decided_moves += 1;
                }
                Decision::KeepRight => {
                    let snapshot = files.clone();
                    let destination = self.mover.move_out(&left)?;
                    self.record(HistoryEntry {
                        decision: Decision::KeepRight,
                        moved_from: Some(left),
                        moved_to: Some(destination),
                        cluster_index: index,
                        snapshot,
                    });
                    files.remove(0);
                    stats.decided_moves += 1;
                }
                Decision::Skip => {
                    let snapshot = files.clone();
                    self.record(HistoryEntry {
                        decision: Decision::Skip,
                        moved_from: None,
                        moved_to: None,
                        cluster_index: index,
                        snapshot,
                    });
                    files.remove(1);
                    stats.skipped_pairs += 1;
                }
                Decision::KeepBoth => {
                    files.remove(1);
                    stats.kept_both += 1;
                }
                Decision::Quit => return Ok(true),
            }
            self.clusters[index].files = files.clone();
        }

        Ok(false)
    }

    fn record(&mut self, entry: HistoryEntry) {
        self.history.push_back(entry);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    fn pair_similarity(&self, left: &Path, right: &Path, kind: MediaKind) -> f64 {
        let sig_left = self.signature(left, kind);
        let sig_right = self.signature(right, kind);
        sig_left.similarity(&sig_right)
    }

    fn signature(&self, path: &Path, kind: MediaKind) -> PerceptualSignature {
        match kind {
            MediaKind::Image => self.hasher.hash_image(path).unwrap_or_else(|e| {
                log::debug!("No signature for {}: {}", path.display(), e);
                PerceptualSignature::empty()
            }),
            MediaKind::Video => {
                self.hasher
                    .hash_video(path, self.config.sample_count, self.config.opener.as_ref())
            }
        }
    }
}
