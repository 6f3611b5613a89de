//! Tambon boundary polygons keyed by (province, tambon) name.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use geo::{MultiPolygon, Polygon};
use geojson::{FeatureCollection, Value};
use tracing::{debug, warn};

/// Province-name property in the boundary file.
pub const PROVINCE_PROPERTY: &str = "PROV_NAM_T";

/// Tambon-name property in the boundary file.
pub const TAMBON_PROPERTY: &str = "TAM_NAM_T";

const TAMBON_PREFIXES: [&str; 3] = ["ตำบล", "ต.", "แขวง"];
const PROVINCE_PREFIXES: [&str; 2] = ["จังหวัด", "จ."];

fn strip_prefixes<'a>(name: &'a str, prefixes: &[&str]) -> &'a str {
    let trimmed = name.trim();
    prefixes
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed)
        .trim()
}

/// Normalises a tambon name (`ต.`, `ตำบล`, `แขวง` prefixes removed).
pub fn normalize_tambon(name: &str) -> String {
    strip_prefixes(name, &TAMBON_PREFIXES).to_string()
}

/// Normalises a province name (`จังหวัด`, `จ.` prefixes removed).
pub fn normalize_province(name: &str) -> String {
    strip_prefixes(name, &PROVINCE_PREFIXES).to_string()
}

/// Lookup of merged tambon polygons.
#[derive(Debug, Default)]
pub struct BoundaryIndex {
    polygons: HashMap<(String, String), MultiPolygon<f64>>,
}

impl BoundaryIndex {
    /// Loads a GeoJSON FeatureCollection from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read boundary file: {}", path.display()))?;
        Self::from_geojson_str(&text)
            .with_context(|| format!("Failed to load boundaries from {}", path.display()))
    }

    /// Parses a FeatureCollection whose features carry province and tambon
    /// names. Polygons sharing a name pair are merged.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let collection: FeatureCollection = text.parse().context("Invalid GeoJSON")?;
        let mut index = Self::default();

        for (i, feature) in collection.features.into_iter().enumerate() {
            let (Some(province), Some(tambon)) = (
                feature.property(PROVINCE_PROPERTY).and_then(|v| v.as_str()),
                feature.property(TAMBON_PROPERTY).and_then(|v| v.as_str()),
            ) else {
                warn!(feature = i, "Boundary feature missing name properties");
                continue;
            };
            let (province, tambon) = (normalize_province(province), normalize_tambon(tambon));

            let Some(geometry) = feature.geometry else {
                warn!(feature = i, %province, %tambon, "Boundary feature has no geometry");
                continue;
            };
            let parts: Vec<Polygon<f64>> = match geometry.value {
                value @ Value::Polygon(_) => vec![value.try_into()?],
                value @ Value::MultiPolygon(_) => {
                    let multi: MultiPolygon<f64> = value.try_into()?;
                    multi.0
                }
                _ => {
                    warn!(feature = i, %province, %tambon, "Skipping non-polygon boundary");
                    continue;
                }
            };

            index.insert(province, tambon, parts);
        }

        debug!(tambons = index.len(), "Loaded boundary index");
        Ok(index)
    }

    /// Adds polygons under an already normalised name pair.
    pub fn insert(&mut self, province: String, tambon: String, parts: Vec<Polygon<f64>>) {
        self.polygons
            .entry((province, tambon))
            .or_insert_with(|| MultiPolygon::new(Vec::new()))
            .0
            .extend(parts);
    }

    /// Looks up the polygon for raw (unnormalised) names.
    pub fn get(&self, province: &str, tambon: &str) -> Option<&MultiPolygon<f64>> {
        self.polygons
            .get(&(normalize_province(province), normalize_tambon(tambon)))
    }

    /// Number of distinct (province, tambon) entries.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Returns true when no boundaries are loaded.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;

    /// Square tambon "ศรีภูมิ" in เชียงใหม่ spanning lat 18.7–18.9, lng 98.9–99.1,
    /// split across two features.
    pub(crate) const SAMPLE_BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"PROV_NAM_T": " เชียงใหม่ ", "TAM_NAM_T": "ต.ศรีภูมิ"},
                "geometry": {"type": "Polygon", "coordinates": [[[98.9, 18.7], [99.0, 18.7], [99.0, 18.9], [98.9, 18.9], [98.9, 18.7]]]}
            },
            {
                "type": "Feature",
                "properties": {"PROV_NAM_T": "เชียงใหม่", "TAM_NAM_T": "ศรีภูมิ"},
                "geometry": {"type": "MultiPolygon", "coordinates": [[[[99.0, 18.7], [99.1, 18.7], [99.1, 18.9], [99.0, 18.9], [99.0, 18.7]]]]}
            },
            {
                "type": "Feature",
                "properties": {"PROV_NAM_T": "เชียงใหม่"},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn prefixes_are_stripped() {
        assert_eq!(normalize_tambon("ต.ศรีภูมิ"), "ศรีภูมิ");
        assert_eq!(normalize_tambon(" ตำบล ช้างคลาน "), "ช้างคลาน");
        assert_eq!(normalize_tambon("แขวงวัดอรุณ"), "วัดอรุณ");
        assert_eq!(normalize_province("จังหวัดเชียงใหม่"), "เชียงใหม่");
        assert_eq!(normalize_province("จ.น่าน"), "น่าน");
        assert_eq!(normalize_province("กรุงเทพมหานคร"), "กรุงเทพมหานคร");
    }

    #[test]
    fn duplicate_names_merge_into_one_multipolygon() {
        let index = BoundaryIndex::from_geojson_str(SAMPLE_BOUNDARIES).unwrap();
        assert_eq!(index.len(), 1);

        let polygon = index.get("จังหวัดเชียงใหม่", "ศรีภูมิ").unwrap();
        assert_eq!(polygon.0.len(), 2);
    }

    #[test]
    fn unknown_tambon_is_absent() {
        let index = BoundaryIndex::from_geojson_str(SAMPLE_BOUNDARIES).unwrap();
        assert!(index.get("เชียงใหม่", "ช้างเผือก").is_none());
    }

    #[test]
    fn invalid_geojson_is_an_error() {
        assert!(BoundaryIndex::from_geojson_str("{\"type\": \"Point\"}").is_err());
    }
}
