//! Batched uploads with a bounded number of requests in flight.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::future::try_join_all;
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::upload::client::FeatureStoreClient;
use crate::upload::feature::{feature_collection, UnitFeature};

/// Units per request unless overridden.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Concurrent requests unless overridden.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Store-assigned object id for an uploaded unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMapping {
    /// Object id assigned by the store.
    pub object_id: String,
    /// Unit id echoed back.
    pub unit_id: String,
    /// Province echoed back.
    pub province_name: String,
}

/// Destination that accepts one feature collection per call.
pub trait FeatureSink: Send + Sync {
    /// Submits one batch and returns the store's response.
    fn submit<'a>(
        &'a self,
        features: &'a FeatureCollection,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;
}

impl FeatureSink for FeatureStoreClient {
    fn submit<'a>(
        &'a self,
        features: &'a FeatureCollection,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
        Box::pin(self.create(features))
    }
}

/// Splits features into batches of at most `batch_size` (minimum 1).
pub fn plan_batches(features: &[UnitFeature], batch_size: usize) -> Vec<&[UnitFeature]> {
    features.chunks(batch_size.max(1)).collect()
}

/// Uploads every batch, at most `concurrency` at a time.
///
/// The first failing batch fails the whole upload; batches already
/// acknowledged by the store are not rolled back.
pub async fn upload_batches<S: FeatureSink>(
    sink: &S,
    features: &[UnitFeature],
    batch_size: usize,
    concurrency: usize,
) -> Result<Vec<Value>> {
    let batches = plan_batches(features, batch_size);
    let total = batches.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let completed = Arc::new(AtomicUsize::new(0));

    let futs: Vec<_> = batches
        .into_iter()
        .enumerate()
        .map(|(index, batch)| {
            let sem = semaphore.clone();
            let completed = completed.clone();

            async move {
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|e| anyhow!("semaphore closed: {e}"))?;

                let collection = feature_collection(batch)?;
                debug!(batch = index, units = batch.len(), "Uploading batch");
                let response = sink.submit(&collection).await?;

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                info!(batch = index, done, total, "Batch uploaded");
                Ok::<_, anyhow::Error>(response)
            }
        })
        .collect();

    try_join_all(futs).await
}

fn property_str(properties: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| match properties.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .unwrap_or_default()
}

/// Extracts `(object id, unit id, province)` from every feature in the
/// store's responses.
pub fn response_mappings(responses: &[Value]) -> Vec<ResponseMapping> {
    responses
        .iter()
        .filter_map(|response| response.get("features").and_then(Value::as_array))
        .flatten()
        .filter_map(|feature| feature.get("properties"))
        .map(|properties| ResponseMapping {
            object_id: property_str(properties, &["_id"]),
            unit_id: property_str(properties, &["unitId", "unit_id"]),
            province_name: property_str(properties, &["provinceName", "province_name"]),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::data::unit::tests::sample_unit;

    fn features(n: i64) -> Vec<UnitFeature> {
        (1..=n)
            .filter_map(|i| UnitFeature::from_unit(&sample_unit(i)))
            .collect()
    }

    #[test]
    fn batches_respect_size_and_keep_remainder() {
        let features = features(5);
        let sizes: Vec<_> = plan_batches(&features, 2).iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(plan_batches(&features, 0).len(), 5);
        assert!(plan_batches(&[], 200).is_empty());
    }

    #[test]
    fn mappings_prefer_camel_case_and_fall_back() {
        let responses = vec![
            json!({"features": [
                {"properties": {"_id": "a1", "unitId": 10, "provinceName": "น่าน"}},
                {"properties": {"_id": "a2", "unit_id": "11", "province_name": "แพร่"}}
            ]}),
            json!({"message": "no features here"}),
        ];
        let mappings = response_mappings(&responses);
        assert_eq!(
            mappings,
            vec![
                ResponseMapping {
                    object_id: "a1".to_string(),
                    unit_id: "10".to_string(),
                    province_name: "น่าน".to_string(),
                },
                ResponseMapping {
                    object_id: "a2".to_string(),
                    unit_id: "11".to_string(),
                    province_name: "แพร่".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn uploads_every_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1.0-beta/collections/c/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features": [{"properties": {"_id": "x", "unitId": 1, "provinceName": "p"}}]
            })))
            .expect(3)
            .mount(&server)
            .await;

        let client = FeatureStoreClient::with_endpoint("k".to_string(), server.uri(), "c").unwrap();
        let responses = upload_batches(&client, &features(5), 2, 2).await.unwrap();

        assert_eq!(responses.len(), 3);
        assert_eq!(response_mappings(&responses).len(), 3);
    }

    /// Sink that records how many submissions overlap.
    #[derive(Default)]
    struct TrackingSink {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        submitted: AtomicUsize,
    }

    impl FeatureSink for TrackingSink {
        fn submit<'a>(
            &'a self,
            features: &'a FeatureCollection,
        ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
            Box::pin(async move {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.submitted.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"units": features.features.len()}))
            })
        }
    }

    #[tokio::test]
    async fn in_flight_batches_never_exceed_concurrency() {
        let sink = TrackingSink::default();
        let responses = upload_batches(&sink, &features(10), 1, 3).await.unwrap();

        assert_eq!(responses.len(), 10);
        assert_eq!(sink.submitted.load(Ordering::SeqCst), 10);
        let max = sink.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 3, "{max} batches were in flight");
        assert!(max >= 2, "batches never overlapped");
        assert_eq!(sink.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_concurrency_still_uploads_one_at_a_time() {
        let sink = TrackingSink::default();
        let responses = upload_batches(&sink, &features(4), 2, 0).await.unwrap();

        assert_eq!(responses, vec![json!({"units": 2}), json!({"units": 2})]);
        assert_eq!(sink.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_batch_fails_the_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = FeatureStoreClient::with_endpoint("k".to_string(), server.uri(), "c").unwrap();
        assert!(upload_batches(&client, &features(3), 1, 4).await.is_err());
    }
}
