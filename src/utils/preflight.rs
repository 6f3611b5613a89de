//! Preflight validation checks for early failure detection
//!
//! Commands call these before doing any work so that a missing input file,
//! credential, or repository fails fast with a clear message.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::utils::settings::get_env_var;

/// Validate a required input file exists
///
/// `hint` is appended to the error to tell the user how to produce the file.
pub fn require_file(path: &Path, description: &str, hint: Option<&str>) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    match hint {
        Some(hint) => bail!("{description} not found: {}\n{hint}", path.display()),
        None => bail!("{description} not found: {}", path.display()),
    }
}

/// Validate an API key is available and return it
///
/// Looks in the environment first, then in the settings file.
pub fn require_api_key(var: &str, purpose: &str) -> Result<String> {
    get_env_var(var).map_err(|_| {
        anyhow::anyhow!(
            "{purpose} API key not found.\n\
             Set the {var} environment variable or add it to ~/.station-geo/settings.json"
        )
    })
}

/// Validate a git repository can be opened at `path`
///
/// This is a lightweight check that opens the repository without
/// loading any commit data.
pub fn check_git_repository_at(path: &Path) -> Result<()> {
    crate::git::GitRepository::open_at(path)
        .with_context(|| format!("Not a git repository: {}", path.display()))?;
    Ok(())
}
