//! Timestamped dataset backups.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::info;

/// Returns `<stem>_backup_<timestamp><.ext>` for `input`.
pub fn backup_file_name(input: &Path, timestamp: &str) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    let extension = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{stem}_backup_{timestamp}{extension}")
}

/// Copies `input` into `backup_dir` under a timestamped name and verifies
/// the copy has the same size.
pub fn create_backup(input: &Path, backup_dir: &Path) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = backup_dir.join(backup_file_name(input, &timestamp));

    fs::create_dir_all(backup_dir)
        .with_context(|| format!("Failed to create backup directory: {}", backup_dir.display()))?;
    fs::copy(input, &backup_path).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            input.display(),
            backup_path.display()
        )
    })?;

    let original_size = fs::metadata(input)
        .with_context(|| format!("Failed to stat {}", input.display()))?
        .len();
    let backup_size = fs::metadata(&backup_path)
        .with_context(|| format!("Backup not found: {}", backup_path.display()))?
        .len();
    if original_size != backup_size {
        bail!(
            "Backup verification failed: size mismatch ({original_size} vs {backup_size} bytes)"
        );
    }

    info!(backup = %backup_path.display(), bytes = backup_size, "Created dataset backup");
    Ok(backup_path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn backup_name_keeps_extension() {
        assert_eq!(
            backup_file_name(Path::new("outputs/units.csv"), "20240101_120000"),
            "units_backup_20240101_120000.csv"
        );
        assert_eq!(
            backup_file_name(Path::new("units"), "t"),
            "units_backup_t"
        );
    }

    #[test]
    fn backup_copies_content() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("units.csv");
        fs::write(&input, "UnitId\n1\n").unwrap();

        let backup = create_backup(&input, &dir.path().join("backups")).unwrap();

        assert_eq!(fs::read_to_string(&backup).unwrap(), "UnitId\n1\n");
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("units_backup_") && name.ends_with(".csv"));
    }

    #[test]
    fn missing_input_fails() {
        let dir = TempDir::new().unwrap();
        assert!(create_backup(&dir.path().join("nope.csv"), dir.path()).is_err());
    }
}
