//! Address geocoding with a durable content-addressed cache.

pub mod cache;
pub mod error;
pub mod provider;

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use cache::{cache_key, CacheStats, CachedGeocoder, DiskStore, KeyValueStore, MemoryStore};
pub use error::GeocodeError;
pub use provider::{GeocodeCandidate, GeocodeProvider, GeocodeQuery, GoogleGeocoder};

use crate::data::{UnitRecord, TIER_FALLBACK};

/// Source label for coordinates filled from the geocoder.
pub const GEOCODER_SOURCE: &str = "Google";

/// Geocoding outcome for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedUnit {
    /// Unit id the lookup was made for.
    pub unit_id: i64,
    /// Query sent to the provider.
    pub query: GeocodeQuery,
    /// Candidates returned, possibly empty.
    pub candidates: Vec<GeocodeCandidate>,
}

/// Builds the lookup for a unit from its name, tambon and province.
pub fn unit_query(unit: &UnitRecord) -> GeocodeQuery {
    GeocodeQuery::new(unit.unit_name.as_str())
        .subdistrict(unit.sub_district_name.as_str())
        .province(unit.province_name.as_str())
        .normalized()
}

/// Geocodes `units` one request at a time.
pub async fn geocode_units<P: GeocodeProvider>(
    provider: &P,
    units: &[UnitRecord],
) -> Result<Vec<GeocodedUnit>> {
    let mut results = Vec::with_capacity(units.len());
    for (i, unit) in units.iter().enumerate() {
        let query = unit_query(unit);
        let candidates = provider.geocode(&query).await?;
        debug!(index = i, unit_id = unit.unit_id, candidates = candidates.len(), "Geocoded unit");
        results.push(GeocodedUnit {
            unit_id: unit.unit_id,
            query,
            candidates,
        });
    }
    info!(units = results.len(), "Geocoding pass complete");
    Ok(results)
}

/// Maps candidate count to number of units with that count.
pub fn candidate_histogram(results: &[GeocodedUnit]) -> BTreeMap<usize, usize> {
    let mut histogram = BTreeMap::new();
    for result in results {
        *histogram.entry(result.candidates.len()).or_insert(0) += 1;
    }
    histogram
}

/// Outcome of joining geocoding results back onto the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillSummary {
    /// Results whose unit id exists in the dataset.
    pub matched: usize,
    /// Results looked up in this pass.
    pub total: usize,
    /// Result unit ids absent from the dataset.
    pub unmatched: Vec<i64>,
    /// Units that gained coordinates.
    pub filled: usize,
    /// Matched units that already had coordinates and were left alone.
    pub already_located: usize,
    /// Matched units lacking coordinates whose lookup found nothing.
    pub no_candidate: usize,
}

/// Joins `results` onto `units` by unit id and copies the first candidate
/// into units lacking coordinates. Filled units get tier `D` and source
/// `Google`.
pub fn fill_missing(units: &mut [UnitRecord], results: &[GeocodedUnit]) -> FillSummary {
    let by_id: HashMap<i64, &GeocodedUnit> = results.iter().map(|r| (r.unit_id, r)).collect();
    let mut summary = FillSummary {
        total: results.len(),
        ..FillSummary::default()
    };

    let mut seen = HashSet::new();
    for unit in units.iter_mut() {
        let Some(result) = by_id.get(&unit.unit_id) else {
            continue;
        };
        if !seen.insert(unit.unit_id) {
            continue;
        }
        summary.matched += 1;
        if unit.coordinates().is_some() {
            summary.already_located += 1;
            continue;
        }
        let Some(candidate) = result.candidates.first() else {
            summary.no_candidate += 1;
            continue;
        };
        unit.lat = Some(candidate.lat);
        unit.lng = Some(candidate.lng);
        unit.place_id = Some(candidate.place_id.clone());
        unit.formatted_address = Some(candidate.formatted_address.clone());
        unit.tier_location = TIER_FALLBACK.to_string();
        unit.correction_source = Some(GEOCODER_SOURCE.to_string());
        summary.filled += 1;
    }

    summary.unmatched = results
        .iter()
        .map(|r| r.unit_id)
        .filter(|id| !seen.contains(id))
        .collect();
    summary.unmatched.sort_unstable();
    summary.unmatched.dedup();
    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;

    use super::*;
    use crate::data::unit::tests::sample_unit;

    /// Answers with one candidate for every address except "nowhere".
    struct FixedProvider;

    impl GeocodeProvider for FixedProvider {
        fn geocode<'a>(
            &'a self,
            query: &'a GeocodeQuery,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<GeocodeCandidate>>> + Send + 'a>> {
            Box::pin(async move {
                if query.address == "nowhere" {
                    return Ok(Vec::new());
                }
                Ok(vec![GeocodeCandidate {
                    lat: 7.0,
                    lng: 100.0,
                    place_id: format!("pid-{}", query.address),
                    formatted_address: "somewhere".to_string(),
                }])
            })
        }
    }

    #[test]
    fn unit_query_uses_name_tambon_and_province() {
        let q = unit_query(&sample_unit(4));
        assert_eq!(q.address, "โรงเรียนบ้าน 4");
        assert_eq!(q.subdistrict.as_deref(), Some("ศรีภูมิ"));
        assert_eq!(q.province.as_deref(), Some("จังหวัดเชียงใหม่"));
        assert_eq!(q.district, None);
    }

    #[tokio::test]
    async fn histogram_and_fill() {
        let mut units = vec![sample_unit(1), sample_unit(2), sample_unit(3)];
        units[1].lat = None;
        units[2].lat = None;
        units[2].unit_name = "nowhere".to_string();

        let results = geocode_units(&FixedProvider, &units).await.unwrap();
        let histogram = candidate_histogram(&results);
        assert_eq!(histogram.get(&1), Some(&2));
        assert_eq!(histogram.get(&0), Some(&1));

        let summary = fill_missing(&mut units, &results);
        assert_eq!(summary.filled, 1);
        assert_eq!(summary.matched, 3);
        assert_eq!(summary.already_located, 1);
        assert_eq!(summary.no_candidate, 1);
        assert!(summary.unmatched.is_empty());
        assert_eq!(units[1].coordinates(), Some((7.0, 100.0)));
        assert_eq!(units[1].correction_source.as_deref(), Some("Google"));
        assert_eq!(units[1].tier_location, "D");
        // Units that already had coordinates are untouched.
        assert_eq!(units[0].coordinates(), Some((18.79, 98.98)));
        assert_eq!(units[2].coordinates(), None);
    }

    #[tokio::test]
    async fn fill_reports_results_missing_from_dataset() {
        let located = sample_unit(1);
        let results = geocode_units(&FixedProvider, &[located.clone(), sample_unit(9)])
            .await
            .unwrap();

        let mut missing = sample_unit(2);
        missing.lat = None;
        let mut units = vec![located, missing];
        let summary = fill_missing(&mut units, &results);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.unmatched, vec![9]);
        assert_eq!(summary.filled, 0);
        // No result for unit 2, so it stays without coordinates.
        assert_eq!(units[1].coordinates(), None);
    }
}
