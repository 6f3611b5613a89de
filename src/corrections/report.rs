//! Correction audit report in JSON and plain text.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::corrections::apply::{AppliedCorrection, Correction, CorrectionOutcome, SkippedCorrection};
use crate::data::{write_json, UnitRecord, TIER_FALLBACK, TIER_VALIDATED};

/// JSON report file name.
pub const JSON_REPORT_NAME: &str = "correction_report.json";

/// Text report file name.
pub const TEXT_REPORT_NAME: &str = "correction_report.txt";

const RULE_WIDTH: usize = 80;

/// Input files the report was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFiles {
    /// Unit dataset path.
    pub main_dataset: String,
    /// Correction export path.
    pub corrections: String,
}

/// Report header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Local time the report was generated (RFC 3339).
    pub generated_at: String,
    /// Tool version.
    pub tool_version: String,
    /// Whether the run modified nothing.
    pub dry_run: bool,
    /// Inputs.
    pub input_files: InputFiles,
}

/// Headline counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Rows in the correction export.
    pub total_correction_rows: usize,
    /// Rows edited and carrying id plus coordinates.
    pub validated_ready: usize,
    /// Corrections applied.
    pub applied: usize,
    /// Corrections skipped.
    pub skipped: usize,
    /// Rows with a corrected name but no coordinates.
    pub pending_geocoding: usize,
}

/// Tier transitions among applied corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierChanges {
    /// Fallback units promoted to validated.
    #[serde(rename = "D_to_A_plus")]
    pub d_to_a_plus: usize,
    /// Already-validated units that were improved.
    #[serde(rename = "A_plus_improved")]
    pub a_plus_improved: usize,
}

/// Dataset-wide tier distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Tier counts before the run.
    pub before: BTreeMap<String, usize>,
    /// Tier counts after the run (same as before on dry runs).
    pub after: BTreeMap<String, usize>,
    /// Applied corrections as a percentage of all units (3 d.p.).
    pub improvement_pct: f64,
}

/// Full audit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionReport {
    /// Header.
    pub metadata: ReportMetadata,
    /// Headline counts.
    pub summary: ReportSummary,
    /// Tier transitions.
    pub tier_changes: TierChanges,
    /// Tier distribution.
    pub quality_metrics: QualityMetrics,
    /// Applied corrections.
    pub corrections_applied: Vec<AppliedCorrection>,
    /// Skipped corrections.
    pub corrections_skipped: Vec<SkippedCorrection>,
}

/// Counts units per tier.
pub fn tier_counts(units: &[UnitRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for unit in units {
        *counts.entry(unit.tier_location.clone()).or_insert(0) += 1;
    }
    counts
}

fn percentage(part: usize, total: usize, decimals: i32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let scale = 10f64.powi(decimals);
    (part as f64 / total as f64 * 100.0 * scale).round() / scale
}

impl CorrectionReport {
    /// Assembles the report from a finished pass.
    ///
    /// `tiers_before` is taken before the pass; `units` is the dataset after
    /// it (unchanged on dry runs).
    pub fn build(
        input_files: InputFiles,
        dry_run: bool,
        corrections: &[Correction],
        tiers_before: BTreeMap<String, usize>,
        units: &[UnitRecord],
        outcome: CorrectionOutcome,
    ) -> Self {
        let applied = outcome.applied.len();
        let count_from = |tier: &str| {
            outcome
                .applied
                .iter()
                .filter(|c| c.tier_before == tier)
                .count()
        };
        let tier_changes = TierChanges {
            d_to_a_plus: count_from(TIER_FALLBACK),
            a_plus_improved: count_from(TIER_VALIDATED),
        };

        Self {
            metadata: ReportMetadata {
                generated_at: Local::now().to_rfc3339(),
                tool_version: crate::VERSION.to_string(),
                dry_run,
                input_files,
            },
            summary: ReportSummary {
                total_correction_rows: corrections.len(),
                validated_ready: outcome.ready,
                applied,
                skipped: outcome.skipped.len(),
                pending_geocoding: corrections.iter().filter(|c| c.needs_geocoding()).count(),
            },
            tier_changes,
            quality_metrics: QualityMetrics {
                after: if dry_run {
                    tiers_before.clone()
                } else {
                    tier_counts(units)
                },
                before: tiers_before,
                improvement_pct: percentage(applied, units.len(), 3),
            },
            corrections_applied: outcome.applied,
            corrections_skipped: outcome.skipped,
        }
    }

    /// Renders the human-readable report.
    pub fn render_text(&self) -> String {
        let rule = "-".repeat(RULE_WIDTH);
        let banner = "=".repeat(RULE_WIDTH);
        let mut out = String::new();

        out.push_str(&format!("{banner}\n"));
        out.push_str(&format!("{:^width$}\n", "Correction Report", width = RULE_WIDTH));
        out.push_str(&format!("{banner}\n"));
        out.push_str(&format!("Generated: {}\n", self.metadata.generated_at));
        out.push_str(&format!("Tool version: {}\n", self.metadata.tool_version));
        out.push_str(&format!("Dataset: {}\n", self.metadata.input_files.main_dataset));
        out.push_str(&format!("Corrections: {}\n", self.metadata.input_files.corrections));
        if self.metadata.dry_run {
            out.push_str("\nDRY RUN - no changes applied\n");
        }
        out.push('\n');

        let s = &self.summary;
        out.push_str(&format!("SUMMARY\n{rule}\n"));
        out.push_str(&format!("Correction rows in file:     {}\n", s.total_correction_rows));
        out.push_str(&format!("  Ready to apply:            {}\n", s.validated_ready));
        out.push_str(&format!("  Applied:                   {}\n", s.applied));
        out.push_str(&format!("  Skipped:                   {}\n", s.skipped));
        out.push_str(&format!("  Pending (needs geocoding): {}\n\n", s.pending_geocoding));

        out.push_str(&format!("TIER CHANGES\n{rule}\n"));
        out.push_str(&format!("Tier D -> A+:     {} units\n", self.tier_changes.d_to_a_plus));
        out.push_str(&format!(
            "Tier A+ improved: {} units\n\n",
            self.tier_changes.a_plus_improved
        ));

        if !self.corrections_applied.is_empty() {
            out.push_str(&format!("CORRECTIONS APPLIED\n{rule}\n"));
            for c in &self.corrections_applied {
                out.push_str(&format!("  UnitId {}: {}, {}\n", c.unit_id, c.province, c.tambon));
                out.push_str(&format!(
                    "    Old: ({}, {}) [{}, {}]\n",
                    display_opt(c.old_coord.lat),
                    display_opt(c.old_coord.lng),
                    c.tier_before,
                    c.source_before
                ));
                out.push_str(&format!(
                    "    New: ({}, {}) [{}, {}]\n",
                    display_opt(c.new_coord.lat),
                    display_opt(c.new_coord.lng),
                    c.tier_after,
                    c.source_after
                ));
                out.push_str(&format!(
                    "    Distance moved: {} km\n",
                    display_opt(c.distance_moved_km)
                ));
                out.push_str(&format!(
                    "    Name changed: {}\n",
                    if c.name_changed { "YES" } else { "NO" }
                ));
                out.push_str(&format!(
                    "    Validation: {:.0}% confidence, within tambon: {}\n\n",
                    c.validation.confidence * 100.0,
                    c.validation.within_tambon
                ));
            }
        }

        if !self.corrections_skipped.is_empty() {
            out.push_str(&format!("CORRECTIONS SKIPPED\n{rule}\n"));
            for c in &self.corrections_skipped {
                out.push_str(&format!("  UnitId {}: {}\n", c.unit_id, c.reason));
            }
            out.push('\n');
        }

        let q = &self.quality_metrics;
        let total: usize = q.after.values().sum();
        out.push_str(&format!("DATASET QUALITY IMPACT\n{rule}\n"));
        for (label, counts) in [("Before corrections", &q.before), ("After corrections", &q.after)] {
            out.push_str(&format!("{label}:\n"));
            for (tier, count) in counts {
                out.push_str(&format!(
                    "  Tier {tier}: {count} units ({:.1}%)\n",
                    percentage(*count, total, 1)
                ));
            }
            out.push_str(&format!("  Total: {total} units\n\n"));
        }
        out.push_str(&format!("Quality improvement: +{:.3}%\n\n", q.improvement_pct));

        if s.pending_geocoding > 0 {
            out.push_str(&format!("PENDING WORK\n{rule}\n"));
            out.push_str(&format!(
                "{} corrections have names but no coordinates.\n",
                s.pending_geocoding
            ));
            out.push_str("Re-geocode them with `station-geo geocode` using the corrected names.\n\n");
        }

        out.push_str(&format!("{banner}\n"));
        out
    }

    /// Writes both report files into `dir` and returns their paths.
    pub fn write(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let json_path = dir.join(JSON_REPORT_NAME);
        let text_path = dir.join(TEXT_REPORT_NAME);

        write_json(&json_path, self)?;
        fs::write(&text_path, self.render_text())
            .with_context(|| format!("Failed to write text report: {}", text_path.display()))?;

        Ok((json_path, text_path))
    }
}

fn display_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
