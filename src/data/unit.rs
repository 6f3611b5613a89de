//! Voting-unit dataset rows.

use serde::{Deserialize, Serialize};

/// Tier for validated or community-corrected coordinates.
pub const TIER_VALIDATED: &str = "A+";

/// Tier for fallback, unvalidated coordinates.
pub const TIER_FALLBACK: &str = "D";

/// One voting unit in the shipped dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Election-commission unit id.
    #[serde(rename = "UnitId")]
    pub unit_id: i64,
    /// Unit (polling place) name.
    #[serde(rename = "UnitName")]
    pub unit_name: String,
    /// Province name.
    #[serde(rename = "ProvinceName")]
    pub province_name: String,
    /// Constituency number.
    #[serde(rename = "DivisionNumber")]
    pub division_number: i64,
    /// District (amphoe) name.
    #[serde(rename = "DistrictName")]
    pub district_name: String,
    /// Subdistrict (tambon) name.
    #[serde(rename = "SubDistrictName")]
    pub sub_district_name: String,
    /// Unit number within the subdistrict.
    #[serde(rename = "UnitNumber")]
    pub unit_number: i64,
    /// Latitude.
    #[serde(rename = "Lat")]
    pub lat: Option<f64>,
    /// Longitude.
    #[serde(rename = "Lng")]
    pub lng: Option<f64>,
    /// Geocoder place id.
    #[serde(rename = "PlaceId", default)]
    pub place_id: Option<String>,
    /// Geocoder formatted address.
    #[serde(rename = "Formatted_Address", default)]
    pub formatted_address: Option<String>,
    /// Location quality tier (`A+` or `D`).
    #[serde(rename = "TierLocation")]
    pub tier_location: String,
    /// Where the coordinates came from (`Google`, `Synthetic`, `WeCheck`).
    #[serde(rename = "CorrectionSource", default)]
    pub correction_source: Option<String>,
    /// Unit name before any correction.
    #[serde(rename = "UnitNameOriginal", default)]
    pub unit_name_original: Option<String>,
    /// Display name, `"<unit number> - <name>"`.
    #[serde(rename = "DisplayUnitName", default)]
    pub display_unit_name: Option<String>,
}

impl UnitRecord {
    /// Returns the coordinate pair when both values are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lng)
    }

    /// Returns the recorded source, or the one implied by the tier.
    pub fn source_or_default(&self) -> String {
        self.correction_source.clone().unwrap_or_else(|| {
            if self.tier_location == TIER_VALIDATED {
                "Google".to_string()
            } else {
                "Synthetic".to_string()
            }
        })
    }
}
