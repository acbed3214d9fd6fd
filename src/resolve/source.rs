//! Decision sources for ambiguous duplicate pairs.
//!
//! Resolution asks a [`DecisionSource`] only when a pair is similar but not
//! bit-identical; exact duplicates are handled automatically. An interactive
//! reviewer, a web handler, and the shipped [`AutoKeepBest`] policy are all
//! the same seam.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A judgment on one pair of near-duplicate files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    /// Keep the left (higher-scored) file; move the right one away.
    KeepLeft,
    /// Keep the right file; move the left one away and promote the right.
    KeepRight,
    /// Keep both files; the pair is not a duplicate after all.
    KeepBoth,
    /// Defer judgment; neither file moves.
    Skip,
    /// Halt the entire resolution run immediately.
    Quit,
}

/// The pair a decision source is asked about.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPair {
    /// The current best member of the cluster.
    pub left: PathBuf,
    /// The challenger being compared against it.
    pub right: PathBuf,
    /// Perceptual similarity of the pair in `[0, 1]`.
    pub similarity: f64,
    /// Index of the cluster being resolved.
    pub cluster_index: usize,
}

/// Supplies decisions for near-duplicate pairs.
pub trait DecisionSource {
    /// Decide what to do with one pair.
    fn decide(&mut self, pair: &ReviewPair) -> Decision;
}

/// Non-interactive policy: always keep the current best member.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoKeepBest;

impl DecisionSource for AutoKeepBest {
    fn decide(&mut self, _pair: &ReviewPair) -> Decision {
        Decision::KeepLeft
    }
}

/// Replays a fixed decision sequence, then skips.
///
/// Used by tests and batch scripting; pairs beyond the scripted sequence are
/// skipped rather than guessed at.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    decisions: std::collections::VecDeque<Decision>,
}

impl ScriptedDecisions {
    /// Create a source replaying the given decisions in order.
    #[must_use]
    pub fn new(decisions: Vec<Decision>) -> Self {
        Self {
            decisions: decisions.into(),
        }
    }

    /// Decisions not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.decisions.len()
    }
}

impl DecisionSource for ScriptedDecisions {
    fn decide(&mut self, _pair: &ReviewPair) -> Decision {
        self.decisions.pop_front().unwrap_or(Decision::Skip)
    }
}
