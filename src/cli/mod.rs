//! CLI interface using clap
//!
//! Provides the command-line interface for IssueMiner

mod commands;

pub use commands::*;

use crate::pattern::TrackerKind;
use clap::{Parser, Subcommand};

/// IssueMiner - link tracked issues to the commits that fixed them
#[derive(Parser, Debug)]
#[command(name = "issueminer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the project database
    #[arg(short, long, global = true, default_value = "issueminer.db")]
    pub db: String,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "issueminer.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short = 'o', long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore the project backups, optimize, and link issues to commits
    Run(RunArgs),

    /// Link issues to commits in an existing database
    Link(LinkArgs),

    /// Recompute fix-version groups and their ordering without re-linking
    Versions(VersionsArgs),

    /// Load commits from a git repository into the database
    Ingest(IngestArgs),
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Tracker kind override on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TrackerChoice {
    Jira,
    Bugzilla,
}

impl From<TrackerChoice> for TrackerKind {
    fn from(choice: TrackerChoice) -> Self {
        match choice {
            TrackerChoice::Jira => TrackerKind::Jira,
            TrackerChoice::Bugzilla => TrackerKind::Bugzilla,
        }
    }
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding <project>_issues.sql and <project>_vcs.sql
    pub backups_dir: String,

    /// Project short name (also the jira key prefix)
    pub project: String,
}

/// Arguments for link command
#[derive(Parser, Debug)]
pub struct LinkArgs {
    /// Project short name (also the jira key prefix)
    pub project: String,

    /// Force a tracker kind instead of probing the database
    #[arg(short, long)]
    pub tracker: Option<TrackerChoice>,

    /// Override the commit file-count filter
    #[arg(short, long)]
    pub max_files: Option<u32>,
}

/// Arguments for versions command
#[derive(Parser, Debug)]
pub struct VersionsArgs {
    /// Only print the derived rows, do not write them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for ingest command
#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// Path to the repository (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: String,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["issueminer", "link", "aries", "--tracker", "jira"]);
        assert!(matches!(cli.command, Commands::Link(_)));

        if let Commands::Link(args) = cli.command {
            assert_eq!(args.project, "aries");
            assert_eq!(args.tracker, Some(TrackerChoice::Jira));
            assert!(args.max_files.is_none());
        }
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["issueminer", "--db", "solr.db", "run", "/backups", "solr"]);
        assert_eq!(cli.db, "solr.db");
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.backups_dir, "/backups");
            assert_eq!(args.project, "solr");
        } else {
            panic!("expected run command");
        }
    }

    #[test]
    fn test_ingest_defaults_to_current_directory() {
        let cli = Cli::parse_from(["issueminer", "ingest"]);
        if let Commands::Ingest(args) = cli.command {
            assert_eq!(args.path, ".");
        } else {
            panic!("expected ingest command");
        }
    }

    #[test]
    fn test_tracker_choice_maps_to_kind() {
        assert_eq!(TrackerKind::from(TrackerChoice::Jira), TrackerKind::Jira);
        assert_eq!(
            TrackerKind::from(TrackerChoice::Bugzilla),
            TrackerKind::Bugzilla
        );
    }
}
