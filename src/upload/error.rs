//! Feature-store error handling.

use thiserror::Error;

/// Failures talking to the feature store.
#[derive(Error, Debug)]
pub enum FeatureStoreError {
    /// API key not found in the environment or settings.
    #[error("Feature store API key not found. Set the VA_DB_API_KEY environment variable")]
    ApiKeyNotFound,

    /// Request completed with a non-success HTTP status.
    #[error("Feature store request failed: HTTP {status}: {body}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Response body could not be decoded.
    #[error("Invalid response format from feature store: {0}")]
    InvalidResponseFormat(String),

    /// Network connectivity error.
    #[error("Network error: {0}")]
    NetworkError(String),
}
