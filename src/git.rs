//! Git history access for the source repository.

pub mod commit;
pub mod repository;

pub use commit::{CommitAnnotation, CommitInfo};
pub use repository::GitRepository;

/// Number of hex characters to show in abbreviated commit hashes.
pub const SHORT_HASH_LEN: usize = 8;
