//! Upload command: publishes voting units to the feature store.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use crate::data::{read_csv, write_csv, UnitRecord};
use crate::upload::client::{DEFAULT_BASE_URL, DEFAULT_COLLECTION_ID};
use crate::upload::{
    plan_batches, response_mappings, upload_batches, FeatureStoreClient, UnitFeature,
    DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY,
};
use crate::utils::settings::FEATURE_STORE_API_KEY_VAR;
use crate::utils::{require_api_key, require_file};

/// Upload command options.
#[derive(Parser)]
pub struct UploadCommand {
    /// Unit dataset to upload.
    #[arg(
        long,
        value_name = "FILE",
        default_value = "outputs/ect66_geocoded_validated.csv"
    )]
    pub dataset: PathBuf,

    /// Units per request.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Requests in flight at once.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Keeps features already in the collection instead of deleting them.
    #[arg(long)]
    pub keep_existing: bool,

    /// Builds the batches and reports counts without any network call.
    #[arg(long)]
    pub dry_run: bool,

    /// Feature store API base.
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Target collection id.
    #[arg(long, value_name = "ID", default_value = DEFAULT_COLLECTION_ID)]
    pub collection: String,

    /// CSV receiving the object id assigned to each uploaded unit.
    #[arg(long, value_name = "FILE", default_value = "outputs/upload_response.csv")]
    pub response_output: PathBuf,
}

impl UploadCommand {
    /// Executes the upload command.
    pub async fn execute(self) -> Result<()> {
        require_file(&self.dataset, "Unit dataset", None)?;
        let api_key = if self.dry_run {
            None
        } else {
            Some(require_api_key(FEATURE_STORE_API_KEY_VAR, "Feature store")?)
        };

        let units: Vec<UnitRecord> = read_csv(&self.dataset)?;
        println!("Loaded {} units from {}", units.len(), self.dataset.display());

        let mut features = Vec::with_capacity(units.len());
        for unit in &units {
            match UnitFeature::from_unit(unit) {
                Some(feature) => features.push(feature),
                None => warn!(unit_id = unit.unit_id, "Skipping unit without coordinates"),
            }
        }
        let skipped = units.len() - features.len();
        if skipped > 0 {
            println!("Skipped {skipped} units without coordinates");
        }

        let batches = plan_batches(&features, self.batch_size).len();
        let Some(api_key) = api_key else {
            println!("DRY RUN: would upload {} units", features.len());
            println!("  Batch size: {}", self.batch_size);
            println!("  Number of batches: {batches}");
            return Ok(());
        };

        let client = FeatureStoreClient::with_endpoint(
            api_key,
            self.base_url.as_str(),
            self.collection.as_str(),
        )?;

        if !self.keep_existing {
            client.delete_all().await?;
            println!("Deleted existing features in {}", client.collection_id());
        }

        let responses =
            upload_batches(&client, &features, self.batch_size, self.concurrency).await?;
        let mappings = response_mappings(&responses);
        write_csv(&self.response_output, &mappings)?;

        println!("Upload complete");
        println!("  Total units uploaded: {}", features.len());
        println!("  Batch size: {}", self.batch_size);
        println!("  Number of batches: {batches}");
        println!(
            "  Saved {} object ids to {}",
            mappings.len(),
            self.response_output.display()
        );
        Ok(())
    }
}
