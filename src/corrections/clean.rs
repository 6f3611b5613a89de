//! Removes personal data from raw correction exports.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::corrections::apply::CORRECTED_NAME_COLUMN;
use crate::data::ensure_parent_dir;

/// Contact phone column dropped from exports.
pub const PII_COLUMN: &str = "เบอร์โทรติดต่อกลับ";

/// Counts reported after cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanSummary {
    /// Data rows written.
    pub rows: usize,
    /// Columns written.
    pub columns: usize,
    /// Whether the PII column was present and removed.
    pub pii_removed: bool,
    /// Rows with `Edited` true.
    pub edited: usize,
    /// Rows with a unit id.
    pub with_unit_id: usize,
    /// Rows with a corrected name.
    pub with_name: usize,
    /// Rows with both coordinates.
    pub with_coordinates: usize,
}

/// Copies `input` to `output` without the PII column.
pub fn clean_corrections(input: &Path, output: &Path) -> Result<CleanSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(input)
        .with_context(|| format!("Failed to open correction export: {}", input.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read headers of {}", input.display()))?
        .clone();

    let pii = headers.iter().position(|h| h.trim() == PII_COLUMN);
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (edited, unit_id, name, lat, lng) = (
        column("Edited"),
        column("UnitId"),
        column(CORRECTED_NAME_COLUMN),
        column("Latitude"),
        column("Longitude"),
    );
    let keep = |record: &csv::StringRecord| -> csv::StringRecord {
        record
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != pii)
            .map(|(_, v)| v)
            .collect()
    };

    ensure_parent_dir(output)?;
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let kept_headers = keep(&headers);
    writer.write_record(&kept_headers)?;

    let present = |record: &csv::StringRecord, idx: Option<usize>| {
        idx.and_then(|i| record.get(i))
            .is_some_and(|v| !v.trim().is_empty())
    };

    let mut summary = CleanSummary {
        columns: kept_headers.len(),
        pii_removed: pii.is_some(),
        ..CleanSummary::default()
    };
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read row {}", i + 1))?;
        writer
            .write_record(&keep(&record))
            .with_context(|| format!("Failed to write row {}", i + 1))?;

        summary.rows += 1;
        if edited
            .and_then(|e| record.get(e))
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
        {
            summary.edited += 1;
        }
        summary.with_unit_id += usize::from(present(&record, unit_id));
        summary.with_name += usize::from(present(&record, name));
        summary.with_coordinates += usize::from(present(&record, lat) && present(&record, lng));
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", output.display()))?;

    debug!(rows = summary.rows, pii_removed = summary.pii_removed, "Cleaned correction export");
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn drops_phone_column_and_counts() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("WeCheck รายงาน.csv");
        fs::write(
            &input,
            "UnitId,Edited,เบอร์โทรติดต่อกลับ,Latitude,Longitude,ชื่อหน่วยเลือกตั้งที่ถูกต้อง\n\
             1,TRUE,0812345678,18.8,99.0,\n\
             ,FALSE,0899999999,,,วัดใหม่\n",
        )
        .unwrap();
        let output = dir.path().join("inputs").join("corrections.csv");

        let summary = clean_corrections(&input, &output).unwrap();

        assert_eq!(
            summary,
            CleanSummary {
                rows: 2,
                columns: 5,
                pii_removed: true,
                edited: 1,
                with_unit_id: 1,
                with_name: 1,
                with_coordinates: 1,
            }
        );
        let written = fs::read_to_string(&output).unwrap();
        assert!(!written.contains("081"));
        assert!(written.starts_with("UnitId,Edited,Latitude,Longitude,"));
    }

    #[test]
    fn export_without_phone_column_is_copied() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(&input, "UnitId,Edited\n5,TRUE\n").unwrap();
        let output = dir.path().join("out.csv");

        let summary = clean_corrections(&input, &output).unwrap();

        assert!(!summary.pii_removed);
        assert_eq!(fs::read_to_string(&output).unwrap(), "UnitId,Edited\n5,TRUE\n");
    }
}
