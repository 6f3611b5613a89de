//! Upload of unit records to the remote feature store.

pub mod batch;
pub mod client;
pub mod error;
pub mod feature;

pub use batch::{
    plan_batches, response_mappings, upload_batches, FeatureSink, ResponseMapping,
    DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY,
};
pub use client::FeatureStoreClient;
pub use error::FeatureStoreError;
pub use feature::{feature_collection, google_maps_url, UnitColor, UnitFeature};
