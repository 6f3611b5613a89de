//! REST client for the remote feature store.

use std::time::Duration;

use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::upload::error::FeatureStoreError;

/// Production API base.
pub const DEFAULT_BASE_URL: &str = "https://b-2.i-bitz.world/core/api/features";

/// Collection holding the voting units.
pub const DEFAULT_COLLECTION_ID: &str = "645ba137f1b89d8b8f1c5f09";

/// API version for item operations.
pub const ITEMS_API_VERSION: &str = "1.0-beta";

/// API version for filtered multi-fetch.
pub const QUERY_API_VERSION: &str = "1.0";

/// Large uploads can take minutes to be acknowledged.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Client bound to one collection.
#[derive(Debug, Clone)]
pub struct FeatureStoreClient {
    client: Client,
    api_key: String,
    base_url: String,
    collection_id: String,
}

impl FeatureStoreClient {
    /// Creates a client for the production collection.
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_endpoint(api_key, DEFAULT_BASE_URL, DEFAULT_COLLECTION_ID)
    }

    /// Creates a client for a custom base URL and collection.
    pub fn with_endpoint(
        api_key: String,
        base_url: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(FeatureStoreError::ApiKeyNotFound.into());
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
            collection_id: collection_id.into(),
        })
    }

    /// Collection this client writes to.
    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// Builds `<base>/<version>/collections/<id>/items[/<object>]?api_key=..`
    /// with any extra query parameters appended.
    fn items_url(
        &self,
        version: &str,
        object_id: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Result<Url> {
        let mut raw = format!(
            "{}/{version}/collections/{}/items",
            self.base_url.trim_end_matches('/'),
            self.collection_id
        );
        if let Some(id) = object_id {
            raw.push('/');
            raw.push_str(id);
        }

        let mut params = vec![("api_key", self.api_key.as_str())];
        params.extend_from_slice(extra);
        Url::parse_with_params(&raw, &params)
            .with_context(|| format!("Invalid feature store URL: {raw}"))
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| FeatureStoreError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FeatureStoreError::InvalidResponseFormat(e.to_string()))?;

        if !status.is_success() {
            return Err(FeatureStoreError::RequestFailed {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        debug!(operation, status = status.as_u16(), bytes = body.len(), "Feature store responded");

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| FeatureStoreError::InvalidResponseFormat(e.to_string()).into())
    }

    /// Adds features to the collection (POST).
    pub async fn create(&self, features: &FeatureCollection) -> Result<Value> {
        let url = self.items_url(ITEMS_API_VERSION, None, &[])?;
        info!(features = features.features.len(), "Creating features");
        self.send(self.client.post(url).json(features), "create").await
    }

    /// Replaces an object with the given features (PUT).
    pub async fn replace(&self, object_id: &str, features: &FeatureCollection) -> Result<Value> {
        let url = self.items_url(ITEMS_API_VERSION, Some(object_id), &[])?;
        info!(object_id, features = features.features.len(), "Replacing features");
        self.send(self.client.put(url).json(features), "replace").await
    }

    /// Partially updates one object (PATCH).
    pub async fn edit_one(&self, object_id: &str, feature: &Feature) -> Result<Value> {
        let url = self.items_url(ITEMS_API_VERSION, Some(object_id), &[])?;
        self.send(self.client.patch(url).json(feature), "edit_one").await
    }

    /// Fetches one object.
    pub async fn get_one(&self, object_id: &str) -> Result<Value> {
        let url = self.items_url(ITEMS_API_VERSION, Some(object_id), &[])?;
        self.send(self.client.get(url), "get_one").await
    }

    /// Fetches objects whose properties match `properties`.
    pub async fn get_many(&self, properties: &[(&str, &str)]) -> Result<Value> {
        let url = self.items_url(QUERY_API_VERSION, None, properties)?;
        self.send(self.client.get(url), "get_many").await
    }

    /// Removes every object in the collection.
    pub async fn delete_all(&self) -> Result<()> {
        let url = self.items_url(ITEMS_API_VERSION, None, &[])?;
        info!(collection = %self.collection_id, "Deleting all features");
        self.send(self.client.delete(url), "delete_all").await?;
        Ok(())
    }
}
