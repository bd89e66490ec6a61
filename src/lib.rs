//! IssueMiner - issue-to-commit linking and release version ordering
//!
//! This library mines version-control history to recover which commits
//! fixed which tracked issues, using the free-text commit message as
//! evidence, and orders the product's release versions from the issues'
//! recorded fix-versions.

pub mod cli;
pub mod config;
pub mod link;
pub mod pattern;
pub mod repo;
pub mod restore;
pub mod scan;
pub mod storage;
pub mod version;

/// Re-export commonly used types
pub use link::{Commit, IssueResolver, Link, Linker, LinkRunReport, ResolvedIssue};
pub use pattern::{IssueReferencePattern, TrackerKind};
pub use scan::CommitScanner;
pub use storage::Database;

/// Application-wide error type
pub use anyhow::Result;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "issueminer";
