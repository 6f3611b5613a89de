//! Geocoding provider trait and the Google Geocoding API client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::geocode::error::GeocodeError;

/// Production Google Geocoding endpoint.
pub const GOOGLE_GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Country component used when none is given.
pub const DEFAULT_COUNTRY: &str = "TH";

/// Result language requested from the provider.
pub const RESULT_LANGUAGE: &str = "th";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Address plus locality filters for one lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeocodeQuery {
    /// Free-form address, usually the unit name.
    pub address: String,
    /// Tambon name.
    pub subdistrict: Option<String>,
    /// Amphoe name.
    pub district: Option<String>,
    /// Province name.
    pub province: Option<String>,
    /// ISO country code.
    pub country: String,
}

impl GeocodeQuery {
    /// Creates a query for `address` in Thailand with no locality filters.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            subdistrict: None,
            district: None,
            province: None,
            country: DEFAULT_COUNTRY.to_string(),
        }
    }

    /// Sets the tambon filter.
    #[must_use]
    pub fn subdistrict(mut self, value: impl Into<String>) -> Self {
        self.subdistrict = Some(value.into());
        self
    }

    /// Sets the amphoe filter.
    #[must_use]
    pub fn district(mut self, value: impl Into<String>) -> Self {
        self.district = Some(value.into());
        self
    }

    /// Sets the province filter.
    #[must_use]
    pub fn province(mut self, value: impl Into<String>) -> Self {
        self.province = Some(value.into());
        self
    }

    /// Returns a copy with every field trimmed and blank filters removed.
    #[must_use]
    pub fn normalized(&self) -> Self {
        fn component(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        let country = self.country.trim();
        Self {
            address: self.address.trim().to_string(),
            subdistrict: component(&self.subdistrict),
            district: component(&self.district),
            province: component(&self.province),
            country: if country.is_empty() {
                DEFAULT_COUNTRY.to_string()
            } else {
                country.to_string()
            },
        }
    }

    /// Renders the `components` filter parameter (`type:value|...`).
    pub fn components(&self) -> String {
        let pairs = [
            ("sublocality_level_2", self.subdistrict.as_deref()),
            ("sublocality_level_1", self.district.as_deref()),
            ("administrative_area_level_1", self.province.as_deref()),
            ("country", Some(self.country.as_str())),
        ];
        pairs
            .iter()
            .filter_map(|(kind, value)| value.map(|v| format!("{kind}:{v}")))
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// One candidate match returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Provider place identifier.
    pub place_id: String,
    /// Provider formatted address.
    pub formatted_address: String,
}

/// A service turning addresses into candidate coordinates.
///
/// An empty candidate list is a valid "no match" answer, not an error.
pub trait GeocodeProvider: Send + Sync {
    /// Looks up candidates for `query`.
    fn geocode<'a>(
        &'a self,
        query: &'a GeocodeQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<GeocodeCandidate>>> + Send + 'a>>;
}

#[derive(Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GoogleResult {
    geometry: GoogleGeometry,
    #[serde(default)]
    place_id: String,
    #[serde(default)]
    formatted_address: String,
}

#[derive(Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
}

#[derive(Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}

impl From<GoogleResult> for GeocodeCandidate {
    fn from(result: GoogleResult) -> Self {
        Self {
            lat: result.geometry.location.lat,
            lng: result.geometry.location.lng,
            place_id: result.place_id,
            formatted_address: result.formatted_address,
        }
    }
}

/// Google Geocoding API client.
pub struct GoogleGeocoder {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GoogleGeocoder {
    /// Creates a client against the production endpoint.
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_endpoint(api_key, GOOGLE_GEOCODE_ENDPOINT)
    }

    /// Creates a client against a custom endpoint.
    pub fn with_endpoint(api_key: String, endpoint: impl Into<String>) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(GeocodeError::ApiKeyNotFound.into());
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.into(),
        })
    }

    fn request_url(&self, query: &GeocodeQuery) -> Result<Url> {
        let components = query.components();
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("address", query.address.as_str()),
                ("components", components.as_str()),
                ("language", RESULT_LANGUAGE),
                ("key", self.api_key.as_str()),
            ],
        )
        .with_context(|| format!("Invalid geocoding endpoint: {}", self.endpoint))
    }
}

impl GeocodeProvider for GoogleGeocoder {
    fn geocode<'a>(
        &'a self,
        query: &'a GeocodeQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<GeocodeCandidate>>> + Send + 'a>> {
        Box::pin(async move {
            let query = query.normalized();
            let url = self.request_url(&query)?;

            info!(address = %query.address, components = %query.components(), "Sending geocoding request");

            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_else(|e| {
                    debug!("Failed to read error response body: {e}");
                    String::new()
                });
                return Err(
                    GeocodeError::RequestFailed(format!("HTTP {status}: {error_text}")).into(),
                );
            }

            let body: GoogleResponse = response
                .json()
                .await
                .map_err(|e| GeocodeError::InvalidResponseFormat(e.to_string()))?;

            match body.status.as_str() {
                "OK" => {
                    let candidates: Vec<GeocodeCandidate> =
                        body.results.into_iter().map(Into::into).collect();
                    debug!(count = candidates.len(), "Received geocoding candidates");
                    Ok(candidates)
                }
                "ZERO_RESULTS" => {
                    debug!(address = %query.address, "No geocoding match");
                    Ok(Vec::new())
                }
                _ => Err(GeocodeError::Status {
                    status: body.status,
                    message: body.error_message.unwrap_or_default(),
                }
                .into()),
            }
        })
    }
}
