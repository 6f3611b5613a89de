//! Parsing community corrections and applying them to the unit dataset.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use geo::{GeodesicDistance, Point};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::corrections::boundary::BoundaryIndex;
use crate::corrections::validate::{validate_coordinate, Validation};
use crate::data::{UnitRecord, TIER_VALIDATED};

/// Source label for community corrections.
pub const CORRECTION_SOURCE: &str = "WeCheck";

/// Column holding the corrected unit name, when one was submitted.
pub const CORRECTED_NAME_COLUMN: &str = "ชื่อหน่วยเลือกตั้งที่ถูกต้อง";

/// One row of the correction export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Correction {
    /// Unit id the correction targets.
    pub unit_id: Option<i64>,
    /// Whether the correction was reviewed and marked edited.
    pub edited: bool,
    /// Claimed latitude.
    pub latitude: Option<f64>,
    /// Claimed longitude.
    pub longitude: Option<f64>,
    /// Corrected unit name.
    pub corrected_name: Option<String>,
}

impl Correction {
    /// Edited and carrying a unit id plus both coordinates.
    pub fn is_ready(&self) -> bool {
        self.edited && self.unit_id.is_some() && self.coordinates().is_some()
    }

    /// Has a corrected name but no usable coordinates.
    pub fn needs_geocoding(&self) -> bool {
        self.corrected_name.is_some() && self.coordinates().is_none()
    }

    /// Returns `(lat, lng)` when both are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

fn field<'a>(record: &'a csv::StringRecord, idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Unit ids may be exported as floats (`1234.0`).
fn parse_unit_id(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

/// Parses the correction export.
pub fn parse_corrections(text: &str) -> Result<Vec<Correction>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .context("Failed to read correction headers")?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (unit_id, edited, lat, lng, name) = (
        column("UnitId"),
        column("Edited"),
        column("Latitude"),
        column("Longitude"),
        column(CORRECTED_NAME_COLUMN),
    );

    let mut corrections = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read correction row {}", i + 1))?;
        let raw_id = field(&record, unit_id);
        let parsed_id = raw_id.and_then(parse_unit_id);
        if raw_id.is_some() && parsed_id.is_none() {
            warn!(row = i + 1, value = ?raw_id, "Ignoring unparseable UnitId");
        }
        corrections.push(Correction {
            unit_id: parsed_id,
            edited: field(&record, edited).is_some_and(parse_flag),
            latitude: field(&record, lat).and_then(|v| v.parse().ok()),
            longitude: field(&record, lng).and_then(|v| v.parse().ok()),
            corrected_name: field(&record, name).map(str::to_string),
        });
    }
    Ok(corrections)
}

/// Reads and parses a correction export from disk.
pub fn load_corrections(path: &Path) -> Result<Vec<Correction>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corrections: {}", path.display()))?;
    parse_corrections(&text)
}

/// Latitude/longitude pair as written in reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
}

/// Record of one applied correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCorrection {
    /// Corrected unit.
    #[serde(rename = "UnitId")]
    pub unit_id: i64,
    /// Province of the unit.
    pub province: String,
    /// Tambon of the unit.
    pub tambon: String,
    /// Coordinates before.
    pub old_coord: LatLng,
    /// Coordinates after.
    pub new_coord: LatLng,
    /// Geodesic distance moved, absent when there were no old coordinates.
    pub distance_moved_km: Option<f64>,
    /// Tier before.
    pub tier_before: String,
    /// Tier after.
    pub tier_after: String,
    /// Coordinate source before.
    pub source_before: String,
    /// Coordinate source after.
    pub source_after: String,
    /// Whether a corrected name was supplied.
    pub name_changed: bool,
    /// Validation detail.
    pub validation: Validation,
}

/// Record of one rejected correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedCorrection {
    /// Targeted unit.
    #[serde(rename = "UnitId")]
    pub unit_id: i64,
    /// Why it was skipped.
    pub reason: String,
}

/// Result of a correction pass.
#[derive(Debug, Clone, Default)]
pub struct CorrectionOutcome {
    /// Number of rows that were ready to apply.
    pub ready: usize,
    /// Applied corrections in input order.
    pub applied: Vec<AppliedCorrection>,
    /// Skipped corrections in input order.
    pub skipped: Vec<SkippedCorrection>,
}

/// Geodesic distance in kilometres, rounded to two decimals.
pub fn distance_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let meters = Point::new(from.1, from.0).geodesic_distance(&Point::new(to.1, to.0));
    (meters / 1000.0 * 100.0).round() / 100.0
}

/// Fills the source and original-name columns for units that lack them.
fn initialise_provenance(units: &mut [UnitRecord]) {
    for unit in units.iter_mut() {
        if unit.correction_source.is_none() {
            unit.correction_source = Some(unit.source_or_default());
        }
        if unit.unit_name_original.is_none() {
            unit.unit_name_original = Some(unit.unit_name.clone());
        }
    }
}

fn apply_to_unit(unit: &mut UnitRecord, lat: f64, lng: f64, corrected_name: Option<&str>) {
    unit.lat = Some(lat);
    unit.lng = Some(lng);
    unit.tier_location = TIER_VALIDATED.to_string();
    unit.correction_source = Some(CORRECTION_SOURCE.to_string());
    unit.place_id = None;
    unit.formatted_address = None;
    if unit.unit_name_original.is_none() {
        unit.unit_name_original = Some(unit.unit_name.clone());
    }
    if let Some(name) = corrected_name {
        unit.unit_name = name.to_string();
        unit.display_unit_name = Some(format!("{} - {name}", unit.unit_number));
    }
}

/// Validates and applies every ready correction.
///
/// With `dry_run` the units are left untouched and the outcome describes
/// what would have happened.
pub fn apply_corrections(
    units: &mut [UnitRecord],
    corrections: &[Correction],
    boundaries: &BoundaryIndex,
    dry_run: bool,
) -> CorrectionOutcome {
    if !dry_run {
        initialise_provenance(units);
    }

    let mut positions: HashMap<i64, usize> = HashMap::new();
    for (i, unit) in units.iter().enumerate() {
        positions.entry(unit.unit_id).or_insert(i);
    }

    let mut outcome = CorrectionOutcome::default();
    for correction in corrections.iter().filter(|c| c.is_ready()) {
        outcome.ready += 1;
        let (Some(unit_id), Some((lat, lng))) = (correction.unit_id, correction.coordinates())
        else {
            continue;
        };

        let Some(&position) = positions.get(&unit_id) else {
            outcome.skipped.push(SkippedCorrection {
                unit_id,
                reason: "UnitId not found in main dataset".to_string(),
            });
            continue;
        };
        let unit = &mut units[position];

        let validation = validate_coordinate(
            lat,
            lng,
            &unit.province_name,
            &unit.sub_district_name,
            boundaries,
        );
        if !validation.passed {
            debug!(unit_id, reason = ?validation.warnings, "Correction failed validation");
            outcome.skipped.push(SkippedCorrection {
                unit_id,
                reason: format!("Validation failed: {}", validation.warnings.join(", ")),
            });
            continue;
        }

        let applied = AppliedCorrection {
            unit_id,
            province: unit.province_name.clone(),
            tambon: unit.sub_district_name.clone(),
            old_coord: LatLng {
                lat: unit.lat,
                lng: unit.lng,
            },
            new_coord: LatLng {
                lat: Some(lat),
                lng: Some(lng),
            },
            distance_moved_km: unit.coordinates().map(|old| distance_km(old, (lat, lng))),
            tier_before: unit.tier_location.clone(),
            tier_after: TIER_VALIDATED.to_string(),
            source_before: unit.source_or_default(),
            source_after: CORRECTION_SOURCE.to_string(),
            name_changed: correction.corrected_name.is_some(),
            validation,
        };

        if !dry_run {
            apply_to_unit(unit, lat, lng, correction.corrected_name.as_deref());
        }
        info!(
            unit_id,
            province = %applied.province,
            tambon = %applied.tambon,
            distance_km = ?applied.distance_moved_km,
            "Applied correction"
        );
        outcome.applied.push(applied);
    }

    outcome
}
