//! Link run orchestration
//!
//! Drives scanning and resolution over the whole commit corpus, keeps the
//! deduplicated link set and counters, and derives the version-group rows
//! from the fix-versions collected during the run.

use super::{Commit, IssueResolver, Link};
use crate::pattern::IssueReferencePattern;
use crate::scan::CommitScanner;
use crate::version::{major_group, natural_cmp};
use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A derived (issue, fix-version, release line) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionTag {
    pub issue_id: i64,
    pub fix_version: String,
    pub major_group: String,
}

/// Outcome of one linking run: counters, the link set and the per-issue
/// raw fix-version lists. Plain data; the caller persists and prints it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkRunReport {
    /// Issues in the tracker, the denominator for the fixed-issue ratio.
    /// Supplied by the caller from the issue store.
    pub issues_examined: u64,
    /// Commits in history before the file-count filter. Supplied by the
    /// caller alongside `issues_examined`.
    pub commits_in_history: u64,
    /// Commits the run actually scanned.
    pub commits_examined: usize,
    /// Commits with at least one pattern occurrence.
    pub commits_with_match: usize,
    /// Pattern occurrences across all scanned messages.
    pub pattern_occurrences: usize,
    /// Occurrences that produced a new link.
    pub occurrences_linked: usize,
    /// Occurrences whose link already existed in this run.
    pub duplicate_links_skipped: usize,
    /// The deduplicated link set.
    pub links: BTreeSet<Link>,
    /// Issues that received at least one link.
    pub linked_issues: BTreeSet<i64>,
    /// Fix-version tokens per linked issue, as recorded on first
    /// resolution. An empty list means the issue has no fix version.
    pub issue_fix_versions: BTreeMap<i64, Vec<String>>,
}

impl LinkRunReport {
    /// Issues that carry at least one fix version.
    pub fn issues_with_fix_version(&self) -> usize {
        self.issue_fix_versions
            .values()
            .filter(|versions| has_fix_version(versions))
            .count()
    }

    /// One row per (issue, fix-version) with its derived release line.
    /// Issues recorded with no fix version contribute nothing.
    pub fn version_tags(&self) -> Vec<VersionTag> {
        version_tags(&self.issue_fix_versions)
    }

    /// Distinct release lines in natural order, ranked from 1 upwards.
    pub fn version_order(&self) -> Vec<(String, u32)> {
        version_order(&self.version_tags())
    }

    /// Human-readable run summary in the shape the tool has always
    /// printed after a linking pass.
    pub fn summary(&self, pattern: &str, max_files: u32) -> String {
        format!(
            "{} of {} commits touch at most {} files\n\
             {} of {} commits contain at least one occurrence of \"{}\"\n\
             \n\
             {} occurrences of \"{}\" found in commit messages\n\
             {} of {} occurrences were linked to an issue\n\
             \n\
             {} of {} issues were fixed by a linked commit\n\
             {} of {} fixed issues carry a fix version",
            self.commits_examined,
            self.commits_in_history,
            max_files,
            self.commits_with_match,
            self.commits_examined,
            pattern,
            self.pattern_occurrences,
            pattern,
            self.occurrences_linked,
            self.pattern_occurrences,
            self.linked_issues.len(),
            self.issues_examined,
            self.issues_with_fix_version(),
            self.linked_issues.len(),
        )
    }
}

/// Derive tag rows from per-issue fix-version lists.
pub fn version_tags(issue_fix_versions: &BTreeMap<i64, Vec<String>>) -> Vec<VersionTag> {
    let mut tags = Vec::new();
    for (&issue_id, versions) in issue_fix_versions {
        if !has_fix_version(versions) {
            tracing::debug!(issue_id, "issue has no fix version");
            continue;
        }
        for version in versions {
            tags.push(VersionTag {
                issue_id,
                fix_version: version.clone(),
                major_group: major_group(version),
            });
        }
    }
    tags
}

/// Rank the distinct release lines observed in `tags`, ascending from 1.
pub fn version_order(tags: &[VersionTag]) -> Vec<(String, u32)> {
    let mut groups: Vec<String> = tags
        .iter()
        .map(|tag| tag.major_group.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    groups.sort_by(|a, b| natural_cmp(a, b));
    groups.into_iter().zip(1u32..).collect()
}

/// Split a raw comma-separated fix-version string into tokens.
///
/// Trailing empty tokens are dropped, so "1.2," yields one token and an
/// empty string yields none.
pub(crate) fn split_fix_versions(raw: &str) -> Vec<String> {
    let mut tokens: Vec<String> = raw.split(',').map(str::to_string).collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    tokens
}

/// A list counts as versioned only when present and its first token is
/// non-empty.
fn has_fix_version(versions: &[String]) -> bool {
    versions.first().is_some_and(|v| !v.is_empty())
}

/// Orchestrates one linking run over a commit corpus.
pub struct Linker<'a, R: IssueResolver> {
    pattern: &'a IssueReferencePattern,
    resolver: &'a R,
}

impl<'a, R: IssueResolver> Linker<'a, R> {
    pub fn new(pattern: &'a IssueReferencePattern, resolver: &'a R) -> Self {
        Self { pattern, resolver }
    }

    /// Scan, resolve and link every commit in the corpus.
    ///
    /// Iteration order of the corpus does not matter; links are keyed by
    /// identity. A resolver failure aborts the run; a candidate without a
    /// matching issue is counted, not an error.
    pub fn link_all<I>(&self, commits: I) -> Result<LinkRunReport>
    where
        I: IntoIterator<Item = Commit>,
    {
        let scanner = CommitScanner::new(self.pattern)?;
        let mut report = LinkRunReport::default();

        for commit in commits {
            report.commits_examined += 1;
            let mut occurrences_here = 0;

            for key in scanner.candidates(&commit.message) {
                report.pattern_occurrences += 1;
                occurrences_here += 1;

                let Some(issue) = self.resolver.resolve(&key)? else {
                    tracing::debug!(key = %key, commit = commit.id, "no issue for candidate");
                    continue;
                };

                if report.linked_issues.insert(issue.issue_id) {
                    report
                        .issue_fix_versions
                        .insert(issue.issue_id, split_fix_versions(&issue.raw_fix_versions));
                }

                let link = Link {
                    issue_id: issue.issue_id,
                    commit_id: commit.id,
                };
                if report.links.insert(link) {
                    report.occurrences_linked += 1;
                } else {
                    report.duplicate_links_skipped += 1;
                    tracing::debug!(
                        issue = issue.issue_id,
                        commit = commit.id,
                        "link already recorded in this run"
                    );
                }
            }

            if occurrences_here > 0 {
                report.commits_with_match += 1;
            } else {
                tracing::trace!(commit = commit.id, "no issue reference in message");
            }
        }

        Ok(report)
    }
}
