//! Geocode command: resolves voting units to coordinate candidates.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use crate::corrections::create_backup;
use crate::data::{read_csv, write_csv, write_json, UnitRecord};
use crate::geocode::provider::GOOGLE_GEOCODE_ENDPOINT;
use crate::geocode::{
    candidate_histogram, fill_missing, geocode_units, CachedGeocoder, DiskStore, GoogleGeocoder,
};
use crate::utils::settings::GEOCODE_API_KEY_VAR;
use crate::utils::{require_api_key, require_file};

/// Geocode command options.
#[derive(Parser)]
pub struct GeocodeCommand {
    /// Unit dataset to geocode.
    #[arg(long, value_name = "FILE", default_value = "intermediate/ect_cleaned.csv")]
    pub dataset: PathBuf,

    /// First row to geocode (0-based, inclusive).
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// Row to stop at (exclusive); defaults to the end of the dataset.
    #[arg(long)]
    pub end: Option<usize>,

    /// JSON file receiving the candidates per unit.
    #[arg(long, value_name = "FILE", default_value = "intermediate/geocode_results.json")]
    pub output: PathBuf,

    /// Directory of the response cache.
    #[arg(long, value_name = "DIR", default_value = ".cache/geocode")]
    pub cache_dir: PathBuf,

    /// Geocoding endpoint.
    #[arg(long, value_name = "URL", default_value = GOOGLE_GEOCODE_ENDPOINT)]
    pub endpoint: String,

    /// Copies the first candidate into units lacking coordinates and
    /// rewrites the dataset.
    #[arg(long)]
    pub fill: bool,

    /// Directory receiving the dataset backup taken before `--fill`.
    #[arg(long, value_name = "DIR", default_value = "outputs/backups")]
    pub backup_dir: PathBuf,
}

impl GeocodeCommand {
    /// Executes the geocode command.
    pub async fn execute(self) -> Result<()> {
        require_file(
            &self.dataset,
            "Unit dataset",
            Some("Export the cleaned unit table to CSV first"),
        )?;
        let api_key = require_api_key(GEOCODE_API_KEY_VAR, "Geocoding")?;

        println!("Loading data from {}...", self.dataset.display());
        let mut units: Vec<UnitRecord> = read_csv(&self.dataset)?;
        println!("Loaded {} voting units", units.len());

        let end = self.end.unwrap_or(units.len()).min(units.len());
        if self.start > end {
            bail!("Invalid range: start {} is past end {end}", self.start);
        }
        let selected = &units[self.start..end];
        println!("Geocoding rows {}..{end} ({} units)", self.start, selected.len());

        let provider = GoogleGeocoder::with_endpoint(api_key, self.endpoint.as_str())?;
        let geocoder = CachedGeocoder::new(provider, DiskStore::open(&self.cache_dir)?);
        let results = geocode_units(&geocoder, selected).await?;

        write_json(&self.output, &results)?;
        println!("Saved {} results to {}", results.len(), self.output.display());

        let stats = geocoder.stats();
        println!("Cache: {} hits, {} misses", stats.hits, stats.misses);

        println!("\nCandidates per unit:");
        let histogram = candidate_histogram(&results);
        for (candidates, count) in &histogram {
            println!("  {candidates}: {count}");
        }
        println!(
            "Units with no match: {}",
            histogram.get(&0).copied().unwrap_or(0)
        );

        if self.fill {
            let summary = fill_missing(&mut units, &results);
            println!("\nMatched: {}/{}", summary.matched, summary.total);
            if !summary.unmatched.is_empty() {
                let ids: Vec<String> = summary.unmatched.iter().map(i64::to_string).collect();
                println!("Unmatched unit ids: {}", ids.join(", "));
            }
            println!("  Already located: {}", summary.already_located);
            println!("  No candidate: {}", summary.no_candidate);

            let backup = create_backup(&self.dataset, &self.backup_dir)?;
            println!("Backup created: {}", backup.display());
            write_csv(&self.dataset, &units)?;
            println!("Filled {} units lacking coordinates", summary.filled);
        }

        println!("\nGeocoding cache location: {}", self.cache_dir.display());
        Ok(())
    }
}
