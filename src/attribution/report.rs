//! Report tables written after an attribution run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::attribution::builder::{AttributedRow, AttributionRun};
use crate::attribution::label_or_none;
use crate::data::write_csv;
use crate::git::CommitInfo;

/// Flat commit row for `commits_metadata.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRow {
    /// Full commit hash.
    pub commit_hash: String,
    /// Author name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Commit time in unix seconds.
    pub timestamp: i64,
    /// Commit time, RFC 3339.
    pub datetime_utc: String,
    /// Subject line.
    pub message: String,
    /// Whether the commit has several parents.
    pub is_merge: bool,
    /// First parent, absent for root commits.
    pub parent_hash: Option<String>,
    /// Rows whose coordinates changed.
    pub rows_changed: usize,
    /// Label, `none` when unprocessed.
    pub classification: String,
    /// Reason for the label.
    pub classification_reason: String,
    /// Seconds since the previous processed commit.
    pub time_since_prev_seconds: Option<i64>,
    /// Snapshot lines added.
    pub lines_added: Option<usize>,
    /// Snapshot lines deleted.
    pub lines_deleted: Option<usize>,
}

impl From<&CommitInfo> for CommitRow {
    fn from(commit: &CommitInfo) -> Self {
        let a = &commit.annotation;
        Self {
            commit_hash: commit.hash.clone(),
            author_name: commit.author_name.clone(),
            author_email: commit.author_email.clone(),
            timestamp: commit.timestamp,
            datetime_utc: commit.datetime_utc.to_rfc3339(),
            message: commit.message.clone(),
            is_merge: commit.is_merge,
            parent_hash: commit.first_parent().map(str::to_string),
            rows_changed: a.rows_changed,
            classification: label_or_none(a.classification).to_string(),
            classification_reason: a.classification_reason.clone(),
            time_since_prev_seconds: a.time_since_prev_seconds,
            lines_added: a.lines_added,
            lines_deleted: a.lines_deleted,
        }
    }
}

/// Flat HEAD row with provenance for `stations_with_source.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationWithSource {
    /// Province number.
    pub province_number: i64,
    /// Province name.
    pub province: String,
    /// Registrar code.
    pub registrar_code: i64,
    /// Registrar name.
    pub registrar: String,
    /// Subdistrict code.
    pub subdis_code: i64,
    /// Subdistrict name.
    pub subdistrict: String,
    /// Electorate number.
    pub electorate: i64,
    /// Location name.
    pub location: String,
    /// Latitude.
    pub latitude: Option<f64>,
    /// Longitude.
    pub longitude: Option<f64>,
    /// Whether both coordinates are present.
    pub has_coords: bool,
    /// Commit that last set the coordinates.
    pub source_commit: Option<String>,
    /// Author of that commit.
    pub source_author: Option<String>,
    /// Label of that commit, `none` when untouched.
    pub source_classification: String,
    /// Time of that commit.
    pub source_timestamp: Option<i64>,
}

impl From<&AttributedRow> for StationWithSource {
    fn from(attributed: &AttributedRow) -> Self {
        let row = &attributed.row;
        let source = attributed.source.as_ref();
        Self {
            province_number: row.key.province_number,
            province: row.province.clone(),
            registrar_code: row.key.registrar_code,
            registrar: row.registrar.clone(),
            subdis_code: row.key.subdis_code,
            subdistrict: row.subdistrict.clone(),
            electorate: row.key.electorate,
            location: row.key.location.clone(),
            latitude: row.coordinate.map(|c| c.lat),
            longitude: row.coordinate.map(|c| c.lng),
            has_coords: row.coordinate.is_some(),
            source_commit: source.map(|s| s.commit_hash.clone()),
            source_author: source.map(|s| s.author_name.clone()),
            source_classification: label_or_none(source.map(|s| s.classification)).to_string(),
            source_timestamp: source.map(|s| s.timestamp),
        }
    }
}

/// Paths of the files produced by [`write_outputs`].
#[derive(Debug, Clone)]
pub struct OutputPaths {
    /// `commits_metadata.csv`.
    pub commits: PathBuf,
    /// `row_changes.csv`.
    pub changes: PathBuf,
    /// `stations_with_source.csv`.
    pub stations: PathBuf,
}

impl OutputPaths {
    /// Standard layout under an output directory.
    pub fn under(output_dir: &Path) -> Self {
        Self {
            commits: output_dir.join("intermediate").join("commits_metadata.csv"),
            changes: output_dir.join("intermediate").join("row_changes.csv"),
            stations: output_dir.join("outputs").join("stations_with_source.csv"),
        }
    }
}

/// Writes the commit table, the row-change table and the attributed HEAD
/// table.
pub fn write_outputs(
    paths: &OutputPaths,
    run: &AttributionRun,
    stations: &[StationWithSource],
) -> Result<()> {
    let commits: Vec<CommitRow> = run.commits.iter().map(CommitRow::from).collect();
    write_csv(&paths.commits, &commits)?;
    write_csv(&paths.changes, &run.changes)?;
    write_csv(&paths.stations, stations)?;
    Ok(())
}

/// Counts commits per classification label, merges included as `none`.
pub fn classification_counts(commits: &[CommitInfo]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for commit in commits {
        *counts
            .entry(label_or_none(commit.annotation.classification))
            .or_insert(0) += 1;
    }
    counts
}

/// Counts HEAD rows per source classification.
pub fn source_counts(stations: &[StationWithSource]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for station in stations {
        *counts
            .entry(station.source_classification.clone())
            .or_insert(0) += 1;
    }
    counts
}

/// Returns `(rows with coordinates, total rows)`.
pub fn coordinate_coverage(stations: &[StationWithSource]) -> (usize, usize) {
    let with_coords = stations.iter().filter(|s| s.has_coords).count();
    (with_coords, stations.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::attribution::builder::Provenance;
    use crate::attribution::snapshot::{Coordinate, NaturalKey, SnapshotRow};
    use crate::attribution::Classification;

    fn attributed(source: Option<Provenance>, coord: Option<Coordinate>) -> AttributedRow {
        AttributedRow {
            row: SnapshotRow {
                key: NaturalKey {
                    province_number: 50,
                    registrar_code: 5001,
                    subdis_code: 500101,
                    electorate: 3,
                    location: "วัดพระสิงห์".to_string(),
                },
                province: "เชียงใหม่".to_string(),
                registrar: "เมือง".to_string(),
                subdistrict: "ศรีภูมิ".to_string(),
                coordinate: coord,
            },
            source,
        }
    }

    #[test]
    fn untouched_rows_report_none() {
        let row = StationWithSource::from(&attributed(None, None));
        assert_eq!(row.source_classification, "none");
        assert!(!row.has_coords);
        assert_eq!(row.source_commit, None);
    }

    #[test]
    fn attributed_rows_carry_provenance() {
        let row = StationWithSource::from(&attributed(
            Some(Provenance {
                commit_hash: "abc".to_string(),
                author_name: "Somchai".to_string(),
                classification: Classification::Manual,
                timestamp: 42,
            }),
            Some(Coordinate {
                lat: 18.79,
                lng: 98.98,
            }),
        ));
        assert_eq!(row.source_classification, "manual");
        assert_eq!(row.source_author.as_deref(), Some("Somchai"));
        assert!(row.has_coords);
    }

    #[test]
    fn coverage_counts_rows_with_coordinates() {
        let rows = vec![
            StationWithSource::from(&attributed(None, None)),
            StationWithSource::from(&attributed(
                None,
                Some(Coordinate {
                    lat: 18.0,
                    lng: 99.0,
                }),
            )),
        ];
        assert_eq!(coordinate_coverage(&rows), (1, 2));
        assert_eq!(source_counts(&rows).get("none"), Some(&2));
    }
}
