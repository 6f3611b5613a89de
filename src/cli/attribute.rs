//! Attribute command: mines the snapshot history for coordinate provenance.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::attribution::report::{
    classification_counts, coordinate_coverage, source_counts, write_outputs, OutputPaths,
    StationWithSource,
};
use crate::attribution::{attribute_rows, AttributionBuilder, Snapshot};
use crate::git::{GitRepository, SHORT_HASH_LEN};
use crate::utils::check_git_repository_at;

/// First commit of the community editing period.
pub const DEFAULT_START_COMMIT: &str = "1be4945dce44986c64a1b6ee2fb627b39104b2c0";

/// Snapshot file tracked in the source repository.
pub const DEFAULT_SNAPSHOT_FILE: &str = "station66_distinct_clean.csv";

/// Attribute command options.
#[derive(Parser)]
pub struct AttributeCommand {
    /// Path to the source repository holding the station snapshot.
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub source_repo: PathBuf,

    /// First commit to analyse (inclusive).
    #[arg(long, value_name = "REV", default_value = DEFAULT_START_COMMIT)]
    pub start: String,

    /// Snapshot file path inside the source repository.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_SNAPSHOT_FILE)]
    pub snapshot: String,

    /// Directory receiving `intermediate/` and `outputs/`.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,
}

impl AttributeCommand {
    /// Executes the attribute command.
    pub fn execute(self) -> Result<()> {
        check_git_repository_at(&self.source_repo)?;
        let repo = GitRepository::open_at(&self.source_repo)?;

        println!("Source repo: {}", self.source_repo.display());
        println!("Output dir: {}", self.output_dir.display());

        println!("\n=== Extracting commit metadata ===");
        let commits = repo.commits_from(&self.start)?;
        let short_start: String = self.start.chars().take(SHORT_HASH_LEN).collect();
        println!("Found {} commits from {short_start}..HEAD", commits.len());
        let merges = commits.iter().filter(|c| c.is_merge).count();
        println!("Processing {} non-merge commits", commits.len() - merges);

        println!("\n=== Parsing changes and classifying ===");
        let run = AttributionBuilder::new(&repo, self.snapshot.as_str()).run(commits);
        for hash in &run.skipped {
            println!("Warning: could not read snapshot at {hash}");
        }
        println!("Detected {} row changes", run.changes.len());

        println!("\nClassification summary:");
        for (label, count) in classification_counts(&run.commits) {
            println!("  {label}: {count}");
        }

        println!("\n=== Building final output ===");
        let head_text = repo
            .file_at("HEAD", &self.snapshot)
            .context("Failed to read snapshot at HEAD")?;
        let head = Snapshot::parse(&head_text).context("Failed to parse snapshot at HEAD")?;
        println!("Loaded {} rows from current snapshot", head.len());

        let stations: Vec<StationWithSource> = attribute_rows(&head, &run.changes)
            .iter()
            .map(StationWithSource::from)
            .collect();

        let paths = OutputPaths::under(&self.output_dir);
        write_outputs(&paths, &run, &stations)?;
        println!("Saved {} commits to {}", run.commits.len(), paths.commits.display());
        println!("Saved {} row changes to {}", run.changes.len(), paths.changes.display());
        println!("Saved {} rows to {}", stations.len(), paths.stations.display());

        println!("\nSource attribution summary:");
        for (source, count) in source_counts(&stations) {
            println!("  {source}: {count}");
        }

        let (with_coords, total) = coordinate_coverage(&stations);
        let pct = if total == 0 {
            0.0
        } else {
            100.0 * with_coords as f64 / total as f64
        };
        println!("\nRows with coordinates: {with_coords} / {total} ({pct:.1}%)");

        Ok(())
    }
}
