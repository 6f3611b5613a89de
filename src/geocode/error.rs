//! Geocoding error handling.

use thiserror::Error;

/// Failures talking to a geocoding provider.
#[derive(Error, Debug)]
pub enum GeocodeError {
    /// API key not found in the environment or settings.
    #[error("Geocoding API key not found. Set the GMAP_API_KEY environment variable")]
    ApiKeyNotFound,

    /// Geocoding request failed with an HTTP error.
    #[error("Geocoding request failed: {0}")]
    RequestFailed(String),

    /// Provider answered with a status other than `OK` or `ZERO_RESULTS`.
    #[error("Geocoding provider returned status {status}: {message}")]
    Status {
        /// Provider status string, e.g. `REQUEST_DENIED`.
        status: String,
        /// Provider error message, empty when none was given.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("Invalid response format from geocoding provider: {0}")]
    InvalidResponseFormat(String),

    /// Network connectivity error.
    #[error("Network error: {0}")]
    NetworkError(String),
}
