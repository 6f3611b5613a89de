//! Read-only access to a source repository's history.

use std::path::Path;

use anyhow::{Context, Result};
use git2::{DiffOptions, Oid, Repository, Sort};
use tracing::debug;

use crate::git::CommitInfo;

/// Git repository wrapper.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Opens the repository at the specified path.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path)
            .with_context(|| format!("Failed to open git repository: {}", path.display()))?;

        Ok(Self { repo })
    }

    /// Resolves a revision to a commit id.
    fn resolve(&self, rev: &str) -> Result<Oid> {
        let obj = self
            .repo
            .revparse_single(rev)
            .with_context(|| format!("Failed to parse revision: {rev}"))?;
        let commit = obj
            .peel_to_commit()
            .with_context(|| format!("Revision is not a commit: {rev}"))?;
        Ok(commit.id())
    }

    /// Lists every commit from `start` (inclusive) up to HEAD, oldest first.
    ///
    /// Equivalent to `git log start^..HEAD`. Merge commits are included and
    /// flagged; callers decide whether to skip them.
    pub fn commits_from(&self, start: &str) -> Result<Vec<CommitInfo>> {
        let start_oid = self.resolve(start)?;
        let start_commit = self
            .repo
            .find_commit(start_oid)
            .context("Failed to find start commit")?;

        let mut walker = self.repo.revwalk().context("Failed to create revwalk")?;
        walker.set_sorting(Sort::TIME).context("Failed to set revwalk order")?;
        walker.push_head().context("Failed to push HEAD")?;
        for parent in start_commit.parent_ids() {
            walker
                .hide(parent)
                .context("Failed to hide start commit parent")?;
        }

        let mut commits = Vec::new();
        for oid in walker {
            let oid = oid.context("Failed to get commit OID from walker")?;
            let commit = self
                .repo
                .find_commit(oid)
                .context("Failed to find commit")?;
            commits.push(CommitInfo::from_git_commit(&commit)?);
        }

        // Stable sort keeps walker order for commits sharing a timestamp
        commits.reverse();
        commits.sort_by_key(|c| c.timestamp);

        debug!(start = %start, count = commits.len(), "Listed commits");
        Ok(commits)
    }

    /// Returns metadata for a single commit.
    pub fn commit_metadata(&self, rev: &str) -> Result<CommitInfo> {
        let oid = self.resolve(rev)?;
        let commit = self.repo.find_commit(oid).context("Failed to find commit")?;
        CommitInfo::from_git_commit(&commit)
    }

    /// Returns the content of `path` at revision `rev`.
    pub fn file_at(&self, rev: &str, path: &str) -> Result<String> {
        let oid = self.resolve(rev)?;
        let commit = self.repo.find_commit(oid).context("Failed to find commit")?;
        let tree = commit.tree().context("Failed to get commit tree")?;
        let entry = tree
            .get_path(Path::new(path))
            .with_context(|| format!("{path} does not exist at {rev}"))?;
        let object = entry
            .to_object(&self.repo)
            .context("Failed to load tree entry")?;
        let blob = object
            .peel_to_blob()
            .with_context(|| format!("{path} is not a file at {rev}"))?;

        String::from_utf8(blob.content().to_vec())
            .with_context(|| format!("{path} at {rev} is not valid UTF-8"))
    }

    /// Returns `(lines_added, lines_deleted)` for `path` between two revisions.
    pub fn diff_stats(&self, from: &str, to: &str, path: &str) -> Result<(usize, usize)> {
        let from_tree = self
            .repo
            .find_commit(self.resolve(from)?)
            .and_then(|c| c.tree())
            .context("Failed to get tree for diff base")?;
        let to_tree = self
            .repo
            .find_commit(self.resolve(to)?)
            .and_then(|c| c.tree())
            .context("Failed to get tree for diff target")?;

        let mut opts = DiffOptions::new();
        opts.pathspec(path);

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&from_tree), Some(&to_tree), Some(&mut opts))
            .context("Failed to create diff")?;
        let stats = diff.stats().context("Failed to get diff stats")?;

        Ok((stats.insertions(), stats.deletions()))
    }
}
