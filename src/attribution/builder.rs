//! Folds commit history into per-row coordinate provenance.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attribution::classify::classify;
use crate::attribution::diff::diff_snapshots;
use crate::attribution::snapshot::{NaturalKey, Snapshot, SnapshotRow};
use crate::attribution::Classification;
use crate::git::{CommitInfo, GitRepository};

/// Read access to snapshot content at arbitrary revisions.
pub trait HistorySource {
    /// Returns the text of `path` at revision `rev`.
    fn snapshot_text(&self, rev: &str, path: &str) -> Result<String>;

    /// Returns `(lines_added, lines_deleted)` for `path` in `commit`.
    fn line_stats(&self, commit: &CommitInfo, path: &str) -> Result<(usize, usize)>;
}

impl HistorySource for GitRepository {
    fn snapshot_text(&self, rev: &str, path: &str) -> Result<String> {
        self.file_at(rev, path)
    }

    fn line_stats(&self, commit: &CommitInfo, path: &str) -> Result<(usize, usize)> {
        let parent = commit
            .first_parent()
            .context("Root commit has no parent to diff against")?;
        self.diff_stats(parent, &commit.hash, path)
    }
}

/// A detected coordinate change attributed to one commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    /// Province number (key).
    pub province_number: i64,
    /// Registrar code (key).
    pub registrar_code: i64,
    /// Subdistrict code (key).
    pub subdis_code: i64,
    /// Electorate number (key).
    pub electorate: i64,
    /// Location name (key).
    pub location: String,
    /// Latitude before, `None` when coordinates were added.
    pub lat_before: Option<f64>,
    /// Longitude before, `None` when coordinates were added.
    pub lng_before: Option<f64>,
    /// Latitude after.
    pub lat_after: Option<f64>,
    /// Longitude after.
    pub lng_after: Option<f64>,
    /// Commit that made the change.
    pub commit_hash: String,
    /// Author name of that commit.
    pub author_name: String,
    /// Author email of that commit.
    pub author_email: String,
    /// Commit timestamp in unix seconds.
    pub timestamp: i64,
    /// Classification of the owning commit.
    pub classification: Classification,
}

impl RowChange {
    /// Returns the natural key of the changed row.
    pub fn key(&self) -> NaturalKey {
        NaturalKey {
            province_number: self.province_number,
            registrar_code: self.registrar_code,
            subdis_code: self.subdis_code,
            electorate: self.electorate,
            location: self.location.clone(),
        }
    }
}

/// Output of walking the history.
#[derive(Debug, Default)]
pub struct AttributionRun {
    /// All commits, oldest first, annotated where processed.
    pub commits: Vec<CommitInfo>,
    /// Every detected row change, in processing order.
    pub changes: Vec<RowChange>,
    /// Hashes of commits whose snapshot could not be read.
    pub skipped: Vec<String>,
}

/// Provenance of a row's current coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    /// Commit that last touched the row's coordinates.
    pub commit_hash: String,
    /// Author of that commit.
    pub author_name: String,
    /// Classification of that commit.
    pub classification: Classification,
    /// Commit timestamp in unix seconds.
    pub timestamp: i64,
}

/// A HEAD row merged with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributedRow {
    /// Row from the HEAD snapshot.
    pub row: SnapshotRow,
    /// Most recent change source, `None` for rows never touched.
    pub source: Option<Provenance>,
}

/// Walks commits and diffs consecutive snapshots of one file.
pub struct AttributionBuilder<'a, H: HistorySource> {
    source: &'a H,
    snapshot_path: String,
}

impl<'a, H: HistorySource> AttributionBuilder<'a, H> {
    /// Creates a builder reading `snapshot_path` from `source`.
    pub fn new(source: &'a H, snapshot_path: impl Into<String>) -> Self {
        Self {
            source,
            snapshot_path: snapshot_path.into(),
        }
    }

    fn load(&self, rev: &str) -> Result<Snapshot> {
        let text = self.source.snapshot_text(rev, &self.snapshot_path)?;
        Snapshot::parse(&text)
    }

    /// Processes `commits` oldest-first, annotating each non-merge commit
    /// and collecting its row changes.
    ///
    /// Merge commits are neither diffed nor classified. A commit whose
    /// snapshot cannot be read is skipped with a warning; the last
    /// successfully read snapshot stays the baseline for the next commit.
    pub fn run(&self, mut commits: Vec<CommitInfo>) -> AttributionRun {
        commits.sort_by_key(|c| c.timestamp);

        let mut previous = self.initial_snapshot(&commits);
        let mut prev_timestamp: Option<i64> = None;
        let mut changes = Vec::new();
        let mut skipped = Vec::new();

        for commit in commits.iter_mut().filter(|c| !c.is_merge) {
            let time_gap = prev_timestamp.map(|prev| commit.timestamp - prev);
            prev_timestamp = Some(commit.timestamp);

            let current = match self.load(&commit.hash) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(commit = %commit.short_hash(), error = %e, "Could not read snapshot; skipping commit");
                    skipped.push(commit.hash.clone());
                    continue;
                }
            };

            let diffs = previous
                .as_ref()
                .map(|prev| diff_snapshots(prev, &current))
                .unwrap_or_default();

            let verdict = classify(&commit.message, diffs.len(), time_gap);
            debug!(
                commit = %commit.short_hash(),
                rows = diffs.len(),
                label = %verdict.label,
                reason = %verdict.reason,
                "Classified commit"
            );

            let annotation = &mut commit.annotation;
            annotation.rows_changed = diffs.len();
            annotation.classification = Some(verdict.label);
            annotation.classification_reason = verdict.reason;
            annotation.time_since_prev_seconds = time_gap;
            match self.source.line_stats(commit, &self.snapshot_path) {
                Ok((added, deleted)) => {
                    commit.annotation.lines_added = Some(added);
                    commit.annotation.lines_deleted = Some(deleted);
                }
                Err(e) => debug!(commit = %commit.short_hash(), error = %e, "No line stats"),
            }

            changes.extend(diffs.into_iter().map(|change| RowChange {
                province_number: change.key.province_number,
                registrar_code: change.key.registrar_code,
                subdis_code: change.key.subdis_code,
                electorate: change.key.electorate,
                location: change.key.location,
                lat_before: change.before.map(|c| c.lat),
                lng_before: change.before.map(|c| c.lng),
                lat_after: Some(change.after.lat),
                lng_after: Some(change.after.lng),
                commit_hash: commit.hash.clone(),
                author_name: commit.author_name.clone(),
                author_email: commit.author_email.clone(),
                timestamp: commit.timestamp,
                classification: verdict.label,
            }));

            previous = Some(current);
        }

        info!(
            commits = commits.len(),
            changes = changes.len(),
            skipped = skipped.len(),
            "Attribution walk complete"
        );

        AttributionRun {
            commits,
            changes,
            skipped,
        }
    }

    /// Loads the baseline from the first non-merge commit's parent.
    fn initial_snapshot(&self, commits: &[CommitInfo]) -> Option<Snapshot> {
        let first = commits.iter().find(|c| !c.is_merge)?;
        let parent = first.first_parent()?;
        match self.load(parent) {
            Ok(snapshot) => {
                debug!(parent = %parent, rows = snapshot.len(), "Loaded baseline snapshot");
                Some(snapshot)
            }
            Err(e) => {
                warn!(parent = %parent, error = %e, "Could not read baseline snapshot");
                None
            }
        }
    }
}

/// Keeps the latest change per natural key. Ties go to the change
/// processed last.
pub fn latest_changes(changes: &[RowChange]) -> HashMap<NaturalKey, &RowChange> {
    let mut latest: HashMap<NaturalKey, &RowChange> = HashMap::new();
    for change in changes {
        latest
            .entry(change.key())
            .and_modify(|current| {
                if change.timestamp >= current.timestamp {
                    *current = change;
                }
            })
            .or_insert(change);
    }
    latest
}

/// Joins the latest change per key onto the HEAD snapshot.
pub fn attribute_rows(head: &Snapshot, changes: &[RowChange]) -> Vec<AttributedRow> {
    let latest = latest_changes(changes);

    head.rows()
        .iter()
        .map(|row| AttributedRow {
            row: row.clone(),
            source: latest.get(&row.key).map(|change| Provenance {
                commit_hash: change.commit_hash.clone(),
                author_name: change.author_name.clone(),
                classification: change.classification,
                timestamp: change.timestamp,
            }),
        })
        .collect()
}
