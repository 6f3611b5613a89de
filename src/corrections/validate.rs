//! Geographic validation of claimed coordinates.

use geo::{Contains, Point};
use serde::{Deserialize, Serialize};

use crate::corrections::boundary::BoundaryIndex;

/// Southern latitude bound of Thailand.
pub const LAT_MIN: f64 = 5.6;
/// Northern latitude bound of Thailand.
pub const LAT_MAX: f64 = 20.5;
/// Western longitude bound of Thailand.
pub const LNG_MIN: f64 = 97.3;
/// Eastern longitude bound of Thailand.
pub const LNG_MAX: f64 = 105.6;

/// Confidence when the point lies inside the expected tambon.
pub const CONFIDENCE_WITHIN_TAMBON: f64 = 0.9;
/// Confidence when the tambon check failed or could not run.
pub const CONFIDENCE_OUTSIDE_TAMBON: f64 = 0.7;

/// Reason recorded for points outside the bounding box.
pub const OUTSIDE_BOUNDS: &str = "Coordinate outside Thailand bounds";
/// Warning for points outside their tambon polygon.
pub const OUTSIDE_TAMBON: &str = "Point outside expected tambon polygon";
/// Warning when no polygon matches the unit's names.
pub const TAMBON_NOT_FOUND: &str = "Tambon polygon not found";

/// Outcome of validating one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    /// Whether the coordinate may be applied.
    pub passed: bool,
    /// Confidence score in `[0, 1]`.
    pub confidence: f64,
    /// Whether the point lies inside the expected tambon.
    pub within_tambon: bool,
    /// Warnings, or the rejection reason when not passed.
    pub warnings: Vec<String>,
}

/// Returns true when the point lies in the Thailand bounding box (inclusive).
pub fn within_thailand(lat: f64, lng: f64) -> bool {
    (LAT_MIN..=LAT_MAX).contains(&lat) && (LNG_MIN..=LNG_MAX).contains(&lng)
}

/// Validates a coordinate against the bounding box, then the tambon polygon
/// named by `province` and `tambon`.
///
/// Anything inside the box passes; the polygon check only moves the
/// confidence and adds warnings.
pub fn validate_coordinate(
    lat: f64,
    lng: f64,
    province: &str,
    tambon: &str,
    boundaries: &BoundaryIndex,
) -> Validation {
    if !within_thailand(lat, lng) {
        return Validation {
            passed: false,
            confidence: 0.0,
            within_tambon: false,
            warnings: vec![OUTSIDE_BOUNDS.to_string()],
        };
    }

    let mut warnings = Vec::new();
    let within_tambon = match boundaries.get(province, tambon) {
        Some(polygon) => {
            let inside = polygon.contains(&Point::new(lng, lat));
            if !inside {
                warnings.push(OUTSIDE_TAMBON.to_string());
            }
            inside
        }
        None => {
            warnings.push(TAMBON_NOT_FOUND.to_string());
            false
        }
    };

    Validation {
        passed: true,
        confidence: if within_tambon {
            CONFIDENCE_WITHIN_TAMBON
        } else {
            CONFIDENCE_OUTSIDE_TAMBON
        },
        within_tambon,
        warnings,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::corrections::boundary::tests::SAMPLE_BOUNDARIES;

    fn index() -> BoundaryIndex {
        BoundaryIndex::from_geojson_str(SAMPLE_BOUNDARIES).unwrap()
    }

    #[test]
    fn point_inside_tambon_has_high_confidence() {
        let v = validate_coordinate(18.8, 99.05, "จังหวัดเชียงใหม่", "ศรีภูมิ", &index());
        assert!(v.passed);
        assert!(v.within_tambon);
        assert_eq!(v.confidence, 0.9);
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn point_outside_tambon_still_passes_with_warning() {
        let v = validate_coordinate(13.75, 100.5, "เชียงใหม่", "ศรีภูมิ", &index());
        assert!(v.passed);
        assert!(!v.within_tambon);
        assert_eq!(v.confidence, 0.7);
        assert_eq!(v.warnings, vec![OUTSIDE_TAMBON.to_string()]);
    }

    #[test]
    fn missing_polygon_passes_with_warning() {
        let v = validate_coordinate(18.8, 99.05, "น่าน", "ในเวียง", &index());
        assert!(v.passed);
        assert_eq!(v.confidence, 0.7);
        assert_eq!(v.warnings, vec![TAMBON_NOT_FOUND.to_string()]);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(within_thailand(5.6, 97.3));
        assert!(within_thailand(20.5, 105.6));
        assert!(!within_thailand(5.59, 100.0));
        assert!(!within_thailand(15.0, 105.61));
    }

    proptest! {
        #[test]
        fn north_of_thailand_is_always_rejected(lat in 20.51f64..90.0, lng in -180.0f64..180.0) {
            let v = validate_coordinate(lat, lng, "เชียงใหม่", "ศรีภูมิ", &index());
            prop_assert!(!v.passed);
            prop_assert_eq!(v.warnings, vec![OUTSIDE_BOUNDS.to_string()]);
        }
    }

    #[test]
    fn latitude_25_is_rejected_even_with_matching_polygon() {
        let v = validate_coordinate(25.0, 99.0, "เชียงใหม่", "ศรีภูมิ", &index());
        assert!(!v.passed);
        assert_eq!(v.confidence, 0.0);
        assert_eq!(v.warnings, vec!["Coordinate outside Thailand bounds".to_string()]);
    }
}
