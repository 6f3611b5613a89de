//! Commit metadata read from the source history.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use git2::Commit;
use serde::{Deserialize, Serialize};

use crate::attribution::Classification;

/// Commit metadata plus the annotations added during attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full SHA-1 hash of the commit.
    pub hash: String,
    /// Author name.
    pub author_name: String,
    /// Author email address.
    pub author_email: String,
    /// Author timestamp in unix seconds.
    pub timestamp: i64,
    /// Author timestamp as UTC.
    pub datetime_utc: DateTime<Utc>,
    /// Subject line of the commit message.
    pub message: String,
    /// Parent hashes, first parent first.
    pub parents: Vec<String>,
    /// Whether the commit has more than one parent.
    pub is_merge: bool,
    /// Analysis results, filled in by the attribution builder.
    #[serde(default)]
    pub annotation: CommitAnnotation,
}

/// Per-commit analysis results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitAnnotation {
    /// Number of rows whose coordinates were added or changed.
    pub rows_changed: usize,
    /// Classification label, `None` for commits that were never classified.
    pub classification: Option<Classification>,
    /// Human-readable reason for the label.
    pub classification_reason: String,
    /// Seconds since the previous non-merge commit.
    pub time_since_prev_seconds: Option<i64>,
    /// Lines added to the snapshot file by this commit.
    pub lines_added: Option<usize>,
    /// Lines deleted from the snapshot file by this commit.
    pub lines_deleted: Option<usize>,
}

impl CommitInfo {
    /// Creates `CommitInfo` from a `git2::Commit`.
    pub fn from_git_commit(commit: &Commit) -> Result<Self> {
        let hash = commit.id().to_string();
        let author = commit.author();

        let timestamp = author.when().seconds();
        let datetime_utc =
            DateTime::from_timestamp(timestamp, 0).context("Invalid commit timestamp")?;

        let message = commit.summary().unwrap_or("").to_string();
        let parents: Vec<String> = commit.parent_ids().map(|id| id.to_string()).collect();

        Ok(Self {
            hash,
            author_name: author.name().unwrap_or("Unknown").to_string(),
            author_email: author.email().unwrap_or("unknown@example.com").to_string(),
            timestamp,
            datetime_utc,
            message,
            is_merge: parents.len() > 1,
            parents,
            annotation: CommitAnnotation::default(),
        })
    }

    /// Returns the first parent hash, if any.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    /// Returns the abbreviated hash used in log lines.
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(super::SHORT_HASH_LEN)]
    }
}
