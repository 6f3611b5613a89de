//! Coordinate attribution mined from the history of a station snapshot file.
//!
//! The pipeline walks commits oldest-first, diffs each commit's snapshot
//! against the previous one, classifies the commit as manual or scripted
//! work, and finally attributes every row of the HEAD snapshot to the most
//! recent commit that touched its coordinates.

pub mod builder;
pub mod classify;
pub mod diff;
pub mod report;
pub mod snapshot;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use builder::{attribute_rows, AttributionBuilder, AttributionRun, HistorySource, RowChange};
pub use classify::{classify, CommitSignals, Rule, Verdict, RULES};
pub use diff::{diff_snapshots, CoordinateChange};
pub use snapshot::{Coordinate, NaturalKey, Snapshot, SnapshotRow};

/// How a commit's coordinate edits were most likely produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Hand-edited by a contributor.
    Manual,
    /// Produced by a script or bulk tool.
    Scripted,
    /// No rule produced a clear signal.
    Uncertain,
}

impl Classification {
    /// Returns the lowercase label used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scripted => "scripted",
            Self::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label used for rows and commits that never received a classification.
pub const UNCLASSIFIED_LABEL: &str = "none";

/// Renders an optional classification, falling back to [`UNCLASSIFIED_LABEL`].
pub fn label_or_none(classification: Option<Classification>) -> &'static str {
    classification.map_or(UNCLASSIFIED_LABEL, Classification::as_str)
}
