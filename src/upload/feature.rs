//! Unit records as GeoJSON features for the feature store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::data::UnitRecord;

const GOOGLE_MAPS_SEARCH: &str = "https://www.google.com/maps/search/";

/// Marker color shown on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitColor {
    /// Not yet observed.
    Gray,
    /// Default for fresh uploads.
    #[default]
    Red,
    /// Observed without incident.
    Green,
}

/// Google Maps search link for a coordinate, pinned to a place when known.
pub fn google_maps_url(lat: f64, lng: f64, place_id: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("api", "1")
        .append_pair("query", &format!("{lat},{lng}"));
    if let Some(id) = place_id.filter(|id| !id.is_empty()) {
        query.append_pair("query_place_id", id);
    }
    format!("{GOOGLE_MAPS_SEARCH}?{}", query.finish())
}

/// Properties of one uploaded unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitFeature {
    /// Election-commission unit id.
    pub unit_id: i64,
    /// Unit name.
    pub unit_name: String,
    /// Province name.
    pub province_name: String,
    /// Constituency number.
    pub division_number: i64,
    /// Amphoe name.
    pub district_name: String,
    /// Tambon name.
    pub sub_district_name: String,
    /// Unit number within the tambon.
    pub unit_number: i64,
    /// Marker color.
    pub color: UnitColor,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Google Maps search link.
    pub google_map_url: String,
    /// Location quality tier.
    pub tier_location: String,
    /// Whether an observer has confirmed the unit.
    pub is_observation_valid: bool,
    /// Time of the last observation.
    pub last_observed_time: Option<DateTime<Utc>>,
    /// Reported incidents.
    pub incident_count: u32,
    /// Reported incident descriptions.
    pub incident_str: String,
}

impl UnitFeature {
    /// Builds the feature for a unit, or `None` when it has no coordinates.
    pub fn from_unit(unit: &UnitRecord) -> Option<Self> {
        let (latitude, longitude) = unit.coordinates()?;
        Some(Self {
            unit_id: unit.unit_id,
            unit_name: unit.unit_name.clone(),
            province_name: unit.province_name.clone(),
            division_number: unit.division_number,
            district_name: unit.district_name.clone(),
            sub_district_name: unit.sub_district_name.clone(),
            unit_number: unit.unit_number,
            color: UnitColor::default(),
            latitude,
            longitude,
            google_map_url: google_maps_url(latitude, longitude, unit.place_id.as_deref()),
            tier_location: unit.tier_location.clone(),
            is_observation_valid: false,
            last_observed_time: None,
            incident_count: 0,
            incident_str: String::new(),
        })
    }

    /// GeoJSON point feature with these properties.
    pub fn to_feature(&self) -> Result<Feature> {
        let properties = match serde_json::to_value(self).context("Failed to encode unit")? {
            serde_json::Value::Object(map) => map,
            _ => JsonObject::new(),
        };
        Ok(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![
                self.longitude,
                self.latitude,
            ]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        })
    }
}

/// Wraps features in a collection.
pub fn feature_collection(units: &[UnitFeature]) -> Result<FeatureCollection> {
    let features = units
        .iter()
        .map(UnitFeature::to_feature)
        .collect::<Result<Vec<_>>>()?;
    Ok(features.into_iter().collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::data::unit::tests::sample_unit;

    #[test]
    fn maps_url_with_and_without_place() {
        insta::assert_snapshot!(
            google_maps_url(13.75, 100.5, None),
            @"https://www.google.com/maps/search/?api=1&query=13.75%2C100.5"
        );
        assert!(google_maps_url(13.75, 100.5, Some("ChIJ")).ends_with("&query_place_id=ChIJ"));
        assert!(!google_maps_url(13.75, 100.5, Some("")).contains("query_place_id"));
    }

    #[test]
    fn maps_url_encodes_place_id() {
        let url = google_maps_url(13.75, 100.5, Some("a&b=c d"));
        assert!(url.ends_with("&query_place_id=a%26b%3Dc+d"));

        let parsed = url::Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("api".to_string(), "1".to_string()),
                ("query".to_string(), "13.75,100.5".to_string()),
                ("query_place_id".to_string(), "a&b=c d".to_string()),
            ]
        );
    }

    #[test]
    fn unit_without_coordinates_has_no_feature() {
        let mut unit = sample_unit(1);
        unit.lng = None;
        assert!(UnitFeature::from_unit(&unit).is_none());
    }

    #[test]
    fn feature_uses_camel_case_and_lng_lat_order() {
        let feature = UnitFeature::from_unit(&sample_unit(7))
            .unwrap()
            .to_feature()
            .unwrap();
        let json = serde_json::to_value(&feature).unwrap();

        assert_eq!(json["geometry"]["type"], "Point");
        assert_eq!(json["geometry"]["coordinates"][0], 98.98);
        assert_eq!(json["geometry"]["coordinates"][1], 18.79);
        let props = &json["properties"];
        assert_eq!(props["unitId"], 7);
        assert_eq!(props["subDistrictName"], "ศรีภูมิ");
        assert_eq!(props["color"], "red");
        assert_eq!(props["isObservationValid"], false);
        assert_eq!(props["incidentCount"], 0);
        assert!(props["lastObservedTime"].is_null());
        assert!(props["googleMapUrl"]
            .as_str()
            .unwrap()
            .contains("query_place_id=place"));
    }

    #[test]
    fn collection_holds_every_feature() {
        let units: Vec<_> = (1..=3)
            .filter_map(|i| UnitFeature::from_unit(&sample_unit(i)))
            .collect();
        assert_eq!(feature_collection(&units).unwrap().features.len(), 3);
    }
}
