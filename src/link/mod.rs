//! Issue-to-commit linking
//!
//! The linker consumes a commit corpus, scans each message for issue
//! references, resolves candidates against the issue store and accumulates
//! a deduplicated link set together with run statistics and the fix-version
//! material needed for release ordering.

mod linker;

pub use linker::{version_order, version_tags, Linker, LinkRunReport, VersionTag};
pub(crate) use linker::split_fix_versions;

use anyhow::Result;
use serde::Serialize;
use std::hash::{Hash, Hasher};

/// One commit read from history.
///
/// Identity is the id alone; the message can be re-fetched but the id is
/// canonical.
#[derive(Debug, Clone, Serialize)]
pub struct Commit {
    pub id: i64,
    pub message: String,
}

impl Commit {
    pub fn new(id: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}

impl PartialEq for Commit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Commit {}

impl Hash for Commit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A confirmed association between one issue and one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Link {
    pub issue_id: i64,
    pub commit_id: i64,
}

/// An issue found for a candidate key, with its recorded fix-versions.
///
/// `raw_fix_versions` is a comma-separated string of zero or more version
/// tokens and may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIssue {
    pub issue_id: i64,
    pub raw_fix_versions: String,
}

/// Lookup boundary to the issue store.
///
/// A lookup returns exactly one issue or `None`; "not found" is a normal
/// outcome and never an error. An `Err` means the lookup itself failed and
/// aborts the run; it is never scored as a miss.
pub trait IssueResolver {
    fn resolve(&self, issue_key: &str) -> Result<Option<ResolvedIssue>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_commit_identity_is_id_only() {
        let a = Commit::new(7, "first message");
        let b = Commit::new(7, "re-fetched message");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_link_ordering_is_stable() {
        let mut links = vec![
            Link { issue_id: 2, commit_id: 1 },
            Link { issue_id: 1, commit_id: 9 },
            Link { issue_id: 1, commit_id: 3 },
        ];
        links.sort();
        assert_eq!(
            links,
            vec![
                Link { issue_id: 1, commit_id: 3 },
                Link { issue_id: 1, commit_id: 9 },
                Link { issue_id: 2, commit_id: 1 },
            ]
        );
    }
}
