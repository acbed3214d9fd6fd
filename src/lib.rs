//! MediaDupe - duplicate and near-duplicate media detection engine.
//!
//! A library for finding duplicate images and videos in a file collection and
//! resolving each duplicate group down to a single surviving file. Detection
//! runs as a multi-stage pipeline (structural fingerprint, BLAKE3 content
//! digest, perceptual similarity) whose pairwise judgments are merged into
//! duplicate clusters with a disjoint-set structure. Resolution scores the
//! members of each cluster, picks a survivor, and applies automatic or
//! externally supplied decisions with a bounded undo history.
//!
//! Directory traversal, the review UI, and CLI parsing are left to callers;
//! the crate consumes file paths and exposes [`cluster::cluster_all`] and
//! [`resolve::ResolveSession`] as its entry points.

pub mod cluster;
pub mod hashing;
pub mod logging;
pub mod media;
pub mod progress;
pub mod resolve;
pub mod scheduler;

pub use cluster::{cluster_all, Cluster, ClusterConfig, ClusterError, ClusterStats};
pub use media::{MediaFile, MediaKind};
pub use resolve::{Decision, DecisionSource, ResolveConfig, ResolveSession};
