//! Parsing of station snapshot CSV files.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Natural key columns, in key order.
pub const KEY_COLUMNS: [&str; 5] = [
    "provinceNumber",
    "registrar_code",
    "subdis_code",
    "electorate",
    "location",
];

const LATITUDE_COLUMN: &str = "latitude";
const LONGITUDE_COLUMN: &str = "longitude";

/// Identifies the same logical station across snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    /// Province number.
    pub province_number: i64,
    /// Registrar (district office) code.
    pub registrar_code: i64,
    /// Subdistrict code.
    pub subdis_code: i64,
    /// Electorate number.
    pub electorate: i64,
    /// Free-text location name.
    pub location: String,
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// One row of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    /// Natural key.
    pub key: NaturalKey,
    /// Province name, empty when the column is absent.
    pub province: String,
    /// Registrar name, empty when the column is absent.
    pub registrar: String,
    /// Subdistrict name, empty when the column is absent.
    pub subdistrict: String,
    /// Coordinates, present only when both values parse.
    pub coordinate: Option<Coordinate>,
}

/// A parsed snapshot of the station table at one revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    rows: Vec<SnapshotRow>,
}

/// Column positions resolved from the CSV header.
struct ColumnIndex {
    keys: [usize; 5],
    latitude: Option<usize>,
    longitude: Option<usize>,
    province: Option<usize>,
    registrar: Option<usize>,
    subdistrict: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let mut keys = [0; 5];
        for (slot, name) in keys.iter_mut().zip(KEY_COLUMNS) {
            *slot = position(name)
                .with_context(|| format!("Snapshot is missing key column '{name}'"))?;
        }

        Ok(Self {
            keys,
            latitude: position(LATITUDE_COLUMN),
            longitude: position(LONGITUDE_COLUMN),
            province: position("province"),
            registrar: position("registrar"),
            subdistrict: position("subdistrict"),
        })
    }
}

impl Snapshot {
    /// Builds a snapshot from already-parsed rows.
    pub fn from_rows(rows: Vec<SnapshotRow>) -> Self {
        Self { rows }
    }

    /// Parses snapshot CSV text.
    pub fn parse(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .context("Failed to read snapshot header")?
            .clone();
        let columns = ColumnIndex::from_headers(&headers)?;

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read snapshot row {line}"))?;
            let field = |idx: usize| record.get(idx).unwrap_or("");
            let optional = |idx: Option<usize>| idx.map(field).unwrap_or("").to_string();
            let integer = |idx: usize| -> Result<i64> {
                field(idx).trim().parse::<i64>().with_context(|| {
                    format!(
                        "Invalid integer '{}' in column '{}' at row {line}",
                        field(idx),
                        headers.get(idx).unwrap_or("?")
                    )
                })
            };

            let key = NaturalKey {
                province_number: integer(columns.keys[0])?,
                registrar_code: integer(columns.keys[1])?,
                subdis_code: integer(columns.keys[2])?,
                electorate: integer(columns.keys[3])?,
                location: field(columns.keys[4]).to_string(),
            };

            let lat = columns.latitude.and_then(|idx| parse_coordinate(field(idx)));
            let lng = columns.longitude.and_then(|idx| parse_coordinate(field(idx)));
            let coordinate = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(Coordinate { lat, lng }),
                _ => None,
            };

            rows.push(SnapshotRow {
                key,
                province: optional(columns.province),
                registrar: optional(columns.registrar),
                subdistrict: optional(columns.subdistrict),
                coordinate,
            });
        }

        Ok(Self { rows })
    }

    /// Returns all rows in file order.
    pub fn rows(&self) -> &[SnapshotRow] {
        &self.rows
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the snapshot has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Builds a key → coordinate lookup. The last row wins on duplicate keys.
    pub fn coordinate_lookup(&self) -> HashMap<&NaturalKey, Option<Coordinate>> {
        let mut lookup = HashMap::with_capacity(self.rows.len());
        for row in &self.rows {
            if lookup.insert(&row.key, row.coordinate).is_some() {
                warn!(key = ?row.key, "Duplicate natural key in snapshot; keeping last row");
            }
        }
        lookup
    }
}

/// Parses a coordinate cell leniently: blank, non-numeric and non-finite
/// values are treated as absent.
fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const HEADER: &str =
        "provinceNumber,province,registrar_code,registrar,subdis_code,subdistrict,electorate,location,latitude,longitude";

    #[test]
    fn parse_reads_keys_and_coordinates() {
        let csv = format!(
            "{HEADER}\n10,กรุงเทพมหานคร,1001,พระนคร,100101,พระบรมมหาราชวัง,1,โรงเรียนวัดราชบพิธ,13.7495,100.4980\n"
        );
        let snapshot = Snapshot::parse(&csv).unwrap();
        assert_eq!(snapshot.len(), 1);

        let row = &snapshot.rows()[0];
        assert_eq!(row.key.province_number, 10);
        assert_eq!(row.key.location, "โรงเรียนวัดราชบพิธ");
        assert_eq!(row.province, "กรุงเทพมหานคร");
        assert_eq!(
            row.coordinate,
            Some(Coordinate {
                lat: 13.7495,
                lng: 100.498
            })
        );
    }

    #[test]
    fn parse_treats_blank_and_garbage_coordinates_as_absent() {
        let csv = format!(
            "{HEADER}\n10,p,1,r,2,s,1,a,,\n10,p,1,r,2,s,2,b,abc,100.1\n10,p,1,r,2,s,3,c,NaN,100.1\n"
        );
        let snapshot = Snapshot::parse(&csv).unwrap();
        assert!(snapshot.rows().iter().all(|r| r.coordinate.is_none()));
    }

    #[test]
    fn parse_rejects_non_integer_key() {
        let csv = format!("{HEADER}\nten,p,1,r,2,s,1,a,13.0,100.0\n");
        let err = Snapshot::parse(&csv).unwrap_err();
        assert!(err.to_string().contains("provinceNumber"));
    }

    #[test]
    fn parse_rejects_missing_key_column() {
        let err = Snapshot::parse("provinceNumber,location\n1,a\n").unwrap_err();
        assert!(err.to_string().contains("registrar_code"));
    }

    #[test]
    fn coordinate_lookup_keeps_last_duplicate() {
        let csv = format!("{HEADER}\n10,p,1,r,2,s,1,a,13.0,100.0\n10,p,1,r,2,s,1,a,14.0,101.0\n");
        let snapshot = Snapshot::parse(&csv).unwrap();
        let lookup = snapshot.coordinate_lookup();
        assert_eq!(lookup.len(), 1);
        let coord = lookup.values().next().unwrap().unwrap();
        assert_eq!(coord.lat, 14.0);
    }
}
