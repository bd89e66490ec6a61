//! Repository ingestion
//!
//! Loads commit history straight from a git repository into the mined
//! commit table, as an alternative to restoring a VCS backup. Each commit
//! contributes its message and the number of files it touched; the
//! revision hash keeps re-ingestion idempotent.

use crate::storage::Database;
use anyhow::{Context, Result};
use git2::Repository as GitRepo;
use std::path::Path;

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    pub ingested: usize,
    pub skipped: usize,
}

/// A git repository being mined for commits.
pub struct MinedRepo {
    repo: GitRepo,
}

impl MinedRepo {
    /// Open the repository at or above the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = GitRepo::discover(path.as_ref())
            .with_context(|| format!("Failed to open git repository at {:?}", path.as_ref()))?;
        Ok(Self { repo })
    }

    /// Walk history from HEAD and load every commit into the store.
    ///
    /// Already-ingested revisions are skipped, so repeated runs only pick
    /// up new history.
    pub fn ingest(&self, db: &Database) -> Result<IngestStats> {
        let mut revwalk = self.repo.revwalk().context("Failed to start revision walk")?;
        revwalk.push_head().context("Failed to push HEAD")?;

        let mut stats = IngestStats::default();
        for oid in revwalk {
            let oid = oid.context("Failed to read revision")?;
            let commit = self
                .repo
                .find_commit(oid)
                .with_context(|| format!("Failed to load commit {}", oid))?;

            let message = commit.message().unwrap_or("").to_string();
            let num_files = self.files_changed(&commit)?;

            if db.insert_commit(&oid.to_string(), &message, num_files)? {
                stats.ingested += 1;
            } else {
                stats.skipped += 1;
            }
        }

        tracing::info!(
            ingested = stats.ingested,
            skipped = stats.skipped,
            "repository ingested"
        );
        Ok(stats)
    }

    /// Number of files a commit touched relative to its first parent.
    fn files_changed(&self, commit: &git2::Commit) -> Result<u32> {
        let tree = commit.tree().context("Failed to get commit tree")?;
        let parent_tree = if commit.parent_count() > 0 {
            Some(
                commit
                    .parent(0)
                    .context("Failed to get parent commit")?
                    .tree()
                    .context("Failed to get parent tree")?,
            )
        } else {
            None
        };

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .context("Failed to diff commit against parent")?;
        let stats = diff.stats().context("Failed to compute diff stats")?;
        Ok(stats.files_changed() as u32)
    }
}
