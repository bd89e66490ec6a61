//! Issue reference patterns
//!
//! Builds the tracker-specific matching rule applied to commit messages:
//! - Jira-style keys derived from a project short name ("ARIES-1234")
//! - Bugzilla-style references built from a fixed vocabulary ("fixed bug #42")
//!
//! Both compile case-insensitive and multi-line.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Which issue tracker's key format and resolution semantics apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    Jira,
    Bugzilla,
}

/// One accepted match of the reference pattern inside a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefMatch<'t> {
    pub start: usize,
    pub end: usize,
    pub text: &'t str,
}

/// Compiled recognizer for issue references in free text.
pub struct IssueReferencePattern {
    kind: TrackerKind,
    regex: Regex,
    source: String,
}

impl IssueReferencePattern {
    /// Build the jira-style pattern for a project short name.
    ///
    /// The project name is case-folded to upper case; matching stays
    /// case-insensitive. The numeric id may be separated from the project
    /// by whitespace and one or more hyphens ("ARIES-1", "Aries - 1").
    pub fn jira(project: &str) -> Result<Self> {
        let upper = project.to_uppercase();
        let source = format!(r"{}\s*-+\s*\d+", regex::escape(&upper));
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .with_context(|| format!("Failed to compile reference pattern for project '{}'", project))?;

        Ok(Self {
            kind: TrackerKind::Jira,
            regex,
            source,
        })
    }

    /// Build the bugzilla-style vocabulary pattern.
    ///
    /// Matches "bug 42", "fixed for #42", "bugzilla id: 42, 43" and the
    /// like; the bare issue number is recovered afterwards with a digit
    /// pattern since the match includes the surrounding vocabulary.
    pub fn bugzilla() -> Result<Self> {
        let source = r"(bug|issue|fixed|fix|bugzilla)+(\s)*(id|for)?(:|-)?\s*#?\s*(\d+)(,\s*\d+)*";
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .context("Failed to compile bugzilla reference pattern")?;

        Ok(Self {
            kind: TrackerKind::Bugzilla,
            regex,
            source: source.to_string(),
        })
    }

    /// Build the pattern for an explicit tracker kind.
    pub fn for_tracker(kind: TrackerKind, project: &str) -> Result<Self> {
        match kind {
            TrackerKind::Jira => Self::jira(project),
            TrackerKind::Bugzilla => Self::bugzilla(),
        }
    }

    pub fn kind(&self) -> TrackerKind {
        self.kind
    }

    /// The pattern source, for reporting.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Find the next accepted match at or after `start`.
    ///
    /// Jira-style candidates must stop at a sane boundary: the digit run
    /// is accepted before whitespace, `:` `,` `]` `)` `(` `;` `_`, a dot
    /// not followed by a word character, or a hyphen not followed by a
    /// letter. This rejects version-like tokens such as "aries-1.1",
    /// "aries-1.x", "aries-1-1" and "aries-1-x" while "ARIES-1," and
    /// "DERBY-2193 " in running prose still match. A rejected span is
    /// skipped whole; the digit run is greedy and a shorter match would
    /// always be followed by another digit, which no boundary accepts.
    pub fn find_from<'t>(&self, text: &'t str, start: usize) -> Option<RefMatch<'t>> {
        let mut pos = start;
        while pos <= text.len() {
            let m = self.regex.find_at(text, pos)?;
            if self.kind != TrackerKind::Jira || jira_boundary_ok(text, m.end()) {
                return Some(RefMatch {
                    start: m.start(),
                    end: m.end(),
                    text: m.as_str(),
                });
            }
            pos = m.end();
        }
        None
    }
}

/// Whether the text following a jira-style match is an accepted boundary.
fn jira_boundary_ok(text: &str, end: usize) -> bool {
    let mut rest = text[end..].chars();
    match rest.next() {
        // The reference must be followed by something; a key at the very
        // end of input does not match (messages carry a trailing newline).
        None => false,
        Some(c) if c.is_whitespace() => true,
        Some(':') | Some(',') | Some(']') | Some(')') | Some('(') | Some(';') | Some('_') => true,
        // "1.1" and "1.x" are versions, "1." ending a sentence is a key.
        Some('.') => !matches!(rest.next(), Some(c) if c.is_alphanumeric() || c == '_'),
        // "1-1" and "1-x" are versions; "1-" before punctuation is a key.
        Some('-') => !matches!(rest.next(), Some(c) if c.is_ascii_alphabetic()),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_match(pattern: &IssueReferencePattern, text: &str) -> Option<String> {
        pattern.find_from(text, 0).map(|m| m.text.to_string())
    }

    #[test]
    fn test_jira_pattern_accepts_plain_keys() {
        let pattern = IssueReferencePattern::jira("aries").unwrap();
        assert_eq!(first_match(&pattern, "ARIES-1 fixed"), Some("ARIES-1".into()));
        assert_eq!(first_match(&pattern, "Aries - 1 fixed"), Some("Aries - 1".into()));
        assert_eq!(first_match(&pattern, "aries-123: done"), Some("aries-123".into()));
    }

    #[test]
    fn test_jira_pattern_is_case_insensitive() {
        let pattern = IssueReferencePattern::jira("derby").unwrap();
        assert_eq!(
            first_match(&pattern, "see derby-2193 for details"),
            Some("derby-2193".into())
        );
        assert_eq!(
            first_match(&pattern, "see DERBY-2193 for details"),
            Some("DERBY-2193".into())
        );
    }

    #[test]
    fn test_jira_pattern_rejects_version_like_tokens() {
        let pattern = IssueReferencePattern::jira("aries").unwrap();
        assert_eq!(first_match(&pattern, "upgrade to aries-1.1 "), None);
        assert_eq!(first_match(&pattern, "upgrade to aries-1.x "), None);
        assert_eq!(first_match(&pattern, "upgrade to aries-1-1 "), None);
        assert_eq!(first_match(&pattern, "upgrade to aries-1-x "), None);
    }

    #[test]
    fn test_jira_pattern_accepts_key_before_punctuation() {
        let pattern = IssueReferencePattern::jira("camel").unwrap();
        assert_eq!(first_match(&pattern, "(CAMEL-1134)"), Some("CAMEL-1134".into()));
        assert_eq!(first_match(&pattern, "CAMEL-7; done"), Some("CAMEL-7".into()));
        assert_eq!(first_match(&pattern, "CAMEL-7. Done"), Some("CAMEL-7".into()));
    }

    #[test]
    fn test_jira_pattern_skips_rejected_span_and_continues() {
        let pattern = IssueReferencePattern::jira("aries").unwrap();
        let text = "bump aries-1.1 then fix aries-2 properly";
        let m = pattern.find_from(text, 0).unwrap();
        assert_eq!(m.text, "aries-2");
    }

    #[test]
    fn test_jira_pattern_requires_a_following_character() {
        let pattern = IssueReferencePattern::jira("aries").unwrap();
        assert_eq!(first_match(&pattern, "fixes ARIES-17"), None);
        assert_eq!(first_match(&pattern, "fixes ARIES-17\n"), Some("ARIES-17".into()));
    }

    #[test]
    fn test_bugzilla_pattern_matches_vocabulary() {
        let pattern = IssueReferencePattern::bugzilla().unwrap();
        assert!(first_match(&pattern, "Fixed bug #123").is_some());
        assert!(first_match(&pattern, "bugzilla id: 42").is_some());
        assert!(first_match(&pattern, "fix for 9, 10, 11").is_some());
        assert!(first_match(&pattern, "no reference here").is_none());
    }

    #[test]
    fn test_for_tracker_dispatch() {
        let jira = IssueReferencePattern::for_tracker(TrackerKind::Jira, "solr").unwrap();
        assert_eq!(jira.kind(), TrackerKind::Jira);
        let bugzilla = IssueReferencePattern::for_tracker(TrackerKind::Bugzilla, "solr").unwrap();
        assert_eq!(bugzilla.kind(), TrackerKind::Bugzilla);
    }
}
