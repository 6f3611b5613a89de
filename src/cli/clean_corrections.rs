//! Clean-corrections command: strips personal data from a raw export.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::corrections::{clean_corrections, PII_COLUMN};
use crate::utils::require_file;

/// Clean-corrections command options.
#[derive(Parser)]
pub struct CleanCorrectionsCommand {
    /// Raw correction export.
    #[arg(
        long,
        value_name = "FILE",
        default_value = "inputs/WeCheck รายงานหน่วยเลือกตั้งที่ไม่ถูก.csv"
    )]
    pub input: PathBuf,

    /// Cleaned output under an ASCII file name.
    #[arg(long, value_name = "FILE", default_value = "inputs/wecheck_corrections.csv")]
    pub output: PathBuf,
}

impl CleanCorrectionsCommand {
    /// Executes the clean-corrections command.
    pub fn execute(self) -> Result<()> {
        require_file(&self.input, "Correction export", None)?;

        let summary = clean_corrections(&self.input, &self.output)?;
        if summary.pii_removed {
            println!("Removed PII column: {PII_COLUMN}");
        } else {
            println!("No PII column found");
        }
        println!(
            "Saved {} rows x {} columns to {}",
            summary.rows,
            summary.columns,
            self.output.display()
        );

        println!("\nSummary:");
        println!("  Edited: {}", summary.edited);
        println!("  With unit id: {}", summary.with_unit_id);
        println!("  With corrected name: {}", summary.with_name);
        println!("  With coordinates: {}", summary.with_coordinates);
        Ok(())
    }
}
