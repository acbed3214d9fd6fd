//! Duplicate cluster formation.
//!
//! [`pipeline`] runs the staged detection (fingerprint, content digest,
//! perceptual similarity) and [`union_find`] merges its pairwise judgments
//! into clusters. [`cluster_all`] is the entry point.

pub mod pipeline;
pub mod union_find;

pub use pipeline::{
    cluster_all, cluster_kind, collect_clusters, exact_groups, merge_groups, representatives,
    Cluster, ClusterConfig, ClusterError, ClusterStats, ExactKey, DEFAULT_SAMPLE_COUNT,
    HIGH_THRESHOLD, LOW_THRESHOLD,
};
pub use union_find::UnionFind;
