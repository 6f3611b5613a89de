//! CLI interface for station-geo.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod attribute;
pub mod clean_corrections;
pub mod correct;
pub mod geocode;
pub mod help;
pub mod upload;

/// station-geo: polling-station coordinate pipeline.
#[derive(Parser)]
#[command(name = "station-geo")]
#[command(
    about = "Attribute, geocode, correct and publish polling-station coordinates",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// The main command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Pipeline stages.
#[derive(Subcommand)]
pub enum Commands {
    /// Attributes station coordinates to the commits that last changed them.
    Attribute(attribute::AttributeCommand),
    /// Geocodes voting units through a cached geocoding provider.
    Geocode(geocode::GeocodeCommand),
    /// Applies validated community corrections to the unit dataset.
    Correct(correct::CorrectCommand),
    /// Strips personal data from a raw correction export.
    #[command(name = "clean-corrections")]
    CleanCorrections(clean_corrections::CleanCorrectionsCommand),
    /// Uploads voting units to the feature store.
    Upload(upload::UploadCommand),
    /// Displays comprehensive help for all commands.
    #[command(name = "help-all")]
    HelpAll(help::HelpCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Attribute(cmd) => cmd.execute(),
            Commands::Geocode(cmd) => cmd.execute().await,
            Commands::Correct(cmd) => cmd.execute(),
            Commands::CleanCorrections(cmd) => cmd.execute(),
            Commands::Upload(cmd) => cmd.execute().await,
            Commands::HelpAll(cmd) => cmd.execute(),
        }
    }
}
