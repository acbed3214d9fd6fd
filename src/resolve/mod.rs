//! Resolution of duplicate clusters down to a single kept file.
//!
//! [`ResolveSession`] walks the clusters produced by detection. Exact
//! duplicates are moved away automatically; near-duplicates go through a
//! [`DecisionSource`]. Moves land in a [`mover::DuplicatesArea`] and the
//! most recent actions stay undoable.

pub mod mover;
pub mod score;
pub mod session;
pub mod source;

pub use mover::{DuplicateMover, DuplicatesArea, MoveError};
pub use score::{quality_score, rank_by_quality};
pub use session::{
    HistoryEntry, ResolveConfig, ResolveError, ResolveSession, ResolveStats, UndoReport,
    HISTORY_LIMIT,
};
pub use source::{AutoKeepBest, Decision, DecisionSource, ReviewPair, ScriptedDecisions};
