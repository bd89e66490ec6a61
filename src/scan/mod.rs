//! Commit message scanning
//!
//! Applies a compiled issue-reference pattern to one commit message at a
//! time: strips the auto-appended mirror provenance line first (its URL can
//! embed tracker-like substrings), then yields normalized candidate issue
//! keys in order of appearance.

use crate::pattern::{IssueReferencePattern, TrackerKind};
use anyhow::{Context, Result};
use regex::Regex;
use std::borrow::Cow;

/// Scanner for candidate issue keys in commit messages.
pub struct CommitScanner<'p> {
    pattern: &'p IssueReferencePattern,
    provenance: Regex,
    digits: Regex,
}

impl<'p> CommitScanner<'p> {
    pub fn new(pattern: &'p IssueReferencePattern) -> Result<Self> {
        // Trailing "git-svn-id: https://svn.apache.org/..." metadata lines
        // would otherwise match project-version tokens in the URL.
        let provenance = Regex::new(r"(\s+git-svn-id:\shttps://svn\.apache\.org/).*")
            .context("Failed to compile provenance pattern")?;
        let digits = Regex::new(r"\d+").context("Failed to compile digit pattern")?;

        Ok(Self {
            pattern,
            provenance,
            digits,
        })
    }

    /// Remove the trailing mirror provenance segment, leaving the rest of
    /// the message intact.
    pub fn strip_provenance<'t>(&self, message: &'t str) -> Cow<'t, str> {
        self.provenance.replace_all(message, "")
    }

    /// Candidate issue keys in the message, left to right.
    ///
    /// The sequence is lazy and yields one candidate per pattern
    /// occurrence; a key repeated in the message is yielded once per
    /// occurrence. Matches are normalized: internal spaces removed and
    /// upper-cased ("Aries - 1" becomes "ARIES-1"); bugzilla-style
    /// matches are reduced to their first digit run, and a match with no
    /// digits is discarded with a debug log rather than an error.
    pub fn candidates(&self, message: &str) -> Candidates<'_> {
        Candidates {
            scanner: self,
            text: self.strip_provenance(message).into_owned(),
            pos: 0,
        }
    }
}

/// Lazy, non-restartable sequence of candidate keys for one message.
pub struct Candidates<'s> {
    scanner: &'s CommitScanner<'s>,
    text: String,
    pos: usize,
}

impl Iterator for Candidates<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let m = self.scanner.pattern.find_from(&self.text, self.pos)?;
            self.pos = m.end;

            let raw = m.text.replace(' ', "");
            match self.scanner.pattern.kind() {
                TrackerKind::Jira => return Some(raw.to_uppercase()),
                TrackerKind::Bugzilla => match self.scanner.digits.find(&raw) {
                    Some(number) => return Some(number.as_str().to_string()),
                    None => {
                        tracing::debug!(candidate = %raw, "no numeric id in matched reference");
                        continue;
                    }
                },
            }
        }
    }
}
