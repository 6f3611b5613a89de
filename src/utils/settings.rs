//! Settings and configuration utilities.
//!
//! Credentials are read from the environment first, then from
//! `$HOME/.station-geo/settings.json` (`{"env": {"GMAP_API_KEY": "..."}}`).

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Directory under the home directory holding `settings.json`.
pub const SETTINGS_DIR: &str = ".station-geo";

/// Geocoding API key variable.
pub const GEOCODE_API_KEY_VAR: &str = "GMAP_API_KEY";

/// Feature-store API key variable.
pub const FEATURE_STORE_API_KEY_VAR: &str = "VA_DB_API_KEY";

/// Settings loaded from $HOME/.station-geo/settings.json.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Environment variable overrides.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Settings {
    /// Loads settings from the default location.
    pub fn load() -> Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Self::load_from_path(&settings_path)
    }

    /// Loads settings from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Settings {
                env: HashMap::new(),
            });
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        serde_json::from_str::<Settings>(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Returns the default settings path.
    pub fn get_settings_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

        Ok(home_dir.join(SETTINGS_DIR).join("settings.json"))
    }

    /// Returns an environment variable with fallback to settings.
    pub fn get_env_var(&self, key: &str) -> Option<String> {
        env::var(key)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.env.get(key).cloned())
    }
}

/// Returns an environment variable with fallback to settings.
pub fn get_env_var(key: &str) -> Result<String> {
    if let Some(value) = env::var(key).ok().filter(|v| !v.trim().is_empty()) {
        return Ok(value);
    }
    match Settings::load() {
        Ok(settings) => settings
            .env
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Environment variable not found: {}", key)),
        Err(err) => Err(anyhow::anyhow!("Environment variable not found: {}", key).context(err)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_settings(dir: &TempDir) -> PathBuf {
        let settings_path = dir.path().join("settings.json");
        fs::write(
            &settings_path,
            r#"{
                "env": {
                    "STATION_GEO_TEST_VAR": "from_settings",
                    "GMAP_API_KEY": "settings_key"
                }
            }"#,
        )
        .unwrap();
        settings_path
    }

    #[test]
    fn settings_load_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(write_settings(&temp_dir)).unwrap();

        assert_eq!(settings.env.get("STATION_GEO_TEST_VAR").unwrap(), "from_settings");
        assert_eq!(settings.env.get(GEOCODE_API_KEY_VAR).unwrap(), "settings_key");
    }

    #[test]
    fn missing_settings_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(temp_dir.path().join("absent.json")).unwrap();
        assert!(settings.env.is_empty());
    }

    #[test]
    fn malformed_settings_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Settings::load_from_path(&path).is_err());
    }

    #[test]
    fn environment_takes_precedence_over_settings() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(write_settings(&temp_dir)).unwrap();

        env::set_var("STATION_GEO_TEST_VAR", "from_env");
        assert_eq!(settings.get_env_var("STATION_GEO_TEST_VAR").unwrap(), "from_env");

        env::remove_var("STATION_GEO_TEST_VAR");
        assert_eq!(settings.get_env_var("STATION_GEO_TEST_VAR").unwrap(), "from_settings");
        assert_eq!(settings.get_env_var("STATION_GEO_TEST_UNSET"), None);
    }
}
