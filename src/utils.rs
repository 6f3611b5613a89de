//! Utility functions and helpers.

pub mod preflight;
pub mod settings;

pub use preflight::{check_git_repository_at, require_api_key, require_file};
pub use settings::{get_env_var, Settings};
