//! Correct command: validates and applies community coordinate corrections.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::corrections::{
    apply_corrections, create_backup, load_corrections, tier_counts, BoundaryIndex,
    CorrectionReport, InputFiles,
};
use crate::data::{read_csv, write_csv, UnitRecord};
use crate::utils::require_file;

/// Correct command options.
#[derive(Parser)]
pub struct CorrectCommand {
    /// Previews changes without modifying any file except the reports.
    #[arg(long)]
    pub dry_run: bool,

    /// Unit dataset receiving the corrections.
    #[arg(
        long,
        value_name = "FILE",
        default_value = "outputs/ect66_geocoded_validated.csv"
    )]
    pub main_dataset: PathBuf,

    /// Cleaned correction export.
    #[arg(long, value_name = "FILE", default_value = "inputs/wecheck_corrections.csv")]
    pub corrections: PathBuf,

    /// Tambon boundaries as a GeoJSON FeatureCollection.
    #[arg(long, value_name = "FILE", default_value = "shapefiles/tambon.geojson")]
    pub boundaries: PathBuf,

    /// Directory for dataset backups.
    #[arg(long, value_name = "DIR", default_value = "outputs/backups")]
    pub backup_dir: PathBuf,

    /// Directory for the correction reports.
    #[arg(long, value_name = "DIR", default_value = "outputs")]
    pub report_dir: PathBuf,
}

impl CorrectCommand {
    /// Executes the correct command.
    pub fn execute(self) -> Result<()> {
        require_file(&self.main_dataset, "Main dataset", None)?;
        require_file(
            &self.corrections,
            "Correction file",
            Some("Run: station-geo clean-corrections"),
        )?;
        require_file(&self.boundaries, "Boundary file", None)?;

        if self.dry_run {
            println!("DRY RUN: no dataset changes will be written");
        }

        let mut units: Vec<UnitRecord> = read_csv(&self.main_dataset)?;
        println!("Loaded {} units from {}", units.len(), self.main_dataset.display());
        let corrections = load_corrections(&self.corrections)?;
        println!("Loaded {} correction rows", corrections.len());
        let boundaries = BoundaryIndex::load(&self.boundaries)?;
        println!("Loaded {} tambon boundaries", boundaries.len());

        if !self.dry_run {
            let backup = create_backup(&self.main_dataset, &self.backup_dir)?;
            println!("Backup created: {}", backup.display());
        }

        let tiers_before = tier_counts(&units);
        let outcome = apply_corrections(&mut units, &corrections, &boundaries, self.dry_run);
        let applied = outcome.applied.len();

        if !self.dry_run && applied > 0 {
            write_csv(&self.main_dataset, &units)?;
            println!("Updated dataset saved: {}", self.main_dataset.display());
        }

        let report = CorrectionReport::build(
            InputFiles {
                main_dataset: self.main_dataset.display().to_string(),
                corrections: self.corrections.display().to_string(),
            },
            self.dry_run,
            &corrections,
            tiers_before,
            &units,
            outcome,
        );
        let (json_path, text_path) = report.write(&self.report_dir)?;

        print!("{}", report.render_text());
        println!("JSON report saved: {}", json_path.display());
        println!("Text report saved: {}", text_path.display());
        Ok(())
    }
}
