//! Tabular records and file serialization.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod unit;

pub use unit::{UnitRecord, TIER_FALLBACK, TIER_VALIDATED};

/// Reads every row of a CSV file with a header.
pub fn read_csv<T, P>(path: P) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| {
            row.with_context(|| format!("Failed to parse row {} of {}", i + 1, path.display()))
        })
        .collect()
}

/// Writes rows to a CSV file, creating parent directories as needed.
pub fn write_csv<T, P>(path: P, rows: &[T]) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush CSV file: {}", path.display()))?;

    Ok(())
}

/// Writes a value as pretty-printed JSON.
pub fn write_json<T, P>(path: P, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write JSON file: {}", path.display()))
}

/// Creates the parent directory of `path` if it has one.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde::Deserialize;
    use tempfile::TempDir;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: i64,
        name: String,
        lat: Option<f64>,
    }

    #[test]
    fn csv_write_then_read_preserves_missing_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("rows.csv");
        let rows = vec![
            Row {
                id: 1,
                name: "วัดพระแก้ว".to_string(),
                lat: Some(13.75),
            },
            Row {
                id: 2,
                name: "no coords".to_string(),
                lat: None,
            },
        ];

        write_csv(&path, &rows).unwrap();
        let back: Vec<Row> = read_csv(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn read_csv_reports_missing_file() {
        let err = read_csv::<Row, _>("/nonexistent/rows.csv").unwrap_err();
        assert!(err.to_string().contains("Failed to open CSV file"));
    }
}
