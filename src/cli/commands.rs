//! Command implementations

use super::OutputFormat;
use crate::config::MinerConfig;
use crate::link::{version_order, version_tags, Linker, LinkRunReport, VersionTag};
use crate::pattern::{IssueReferencePattern, TrackerKind};
use crate::repo::MinedRepo;
use crate::restore::BackupRestorer;
use crate::storage::{Database, PersistStats};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Everything a link run produced, for JSON output.
#[derive(Debug, Serialize)]
struct LinkOutcome {
    report: LinkRunReport,
    persist: PersistStats,
}

/// Derived version rows, for JSON output of the versions command.
#[derive(Debug, Serialize)]
struct VersionsOutcome {
    tags: Vec<VersionTag>,
    order: Vec<(String, u32)>,
    persist: Option<PersistStats>,
}

/// Restore the project backups, run the optimization script, then link.
pub fn run(
    db_path: &Path,
    config: &MinerConfig,
    backups_dir: &Path,
    project: &str,
    format: OutputFormat,
) -> Result<()> {
    let restorer = BackupRestorer::new(Duration::from_secs(config.restore_timeout_secs));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    println!("Restoring backups from {:?}...", backups_dir);
    runtime
        .block_on(restorer.restore_pair(backups_dir, project, db_path))
        .context("Failed to restore backups")?;

    {
        let db = Database::open(db_path)?;
        println!("Running optimization...");
        let executed = db.optimize(project)?;
        tracing::debug!(executed, "optimization statements executed");
    }

    link(db_path, config, project, None, None, format)
}

/// Link issues to commits and persist the result.
pub fn link(
    db_path: &Path,
    config: &MinerConfig,
    project: &str,
    tracker_override: Option<TrackerKind>,
    max_files_override: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let mut db = Database::open(db_path)?;

    let kind = match tracker_override.or(config.tracker) {
        Some(kind) => kind,
        None => db.tracker_kind()?,
    };
    let max_files = max_files_override.unwrap_or(config.max_files_per_commit);
    let pattern = IssueReferencePattern::for_tracker(kind, project)?;

    println!("Linking issues to commits...");
    let commits = db.commits(max_files)?;
    let mut report = {
        let resolver = db.resolver(kind);
        Linker::new(&pattern, &resolver).link_all(commits)?
    };
    report.issues_examined = db.count_issues()?;
    report.commits_in_history = db.count_commits()?;

    let persist = db.persist_report(&report)?;

    match format {
        OutputFormat::Text => {
            println!("\n{}\n", report.summary(pattern.as_str(), max_files));
            print_persist_stats(&persist);
        }
        OutputFormat::Json => {
            let outcome = LinkOutcome { report, persist };
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

/// Recompute fix-version tags and ordering from the stored issues.
pub fn versions(db_path: &Path, dry_run: bool, format: OutputFormat) -> Result<()> {
    let mut db = Database::open(db_path)?;

    let fix_versions = db.issue_fix_versions()?;
    let tags = version_tags(&fix_versions);
    let order = version_order(&tags);

    let persist = if dry_run {
        None
    } else {
        Some(db.persist_versions(&tags, &order)?)
    };

    match format {
        OutputFormat::Text => {
            println!(
                "{} fix versions across {} issues, {} release lines",
                tags.len(),
                fix_versions.len(),
                order.len()
            );
            for (group, rank) in &order {
                println!("  {:>3}. {}", rank, group);
            }
            if let Some(stats) = persist {
                print_persist_stats(&stats);
            }
        }
        OutputFormat::Json => {
            let outcome = VersionsOutcome {
                tags,
                order,
                persist,
            };
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

/// Load commits from a git repository into the database.
pub fn ingest(db_path: &Path, repo_path: &Path) -> Result<()> {
    let db = Database::open(db_path)?;
    let repo = MinedRepo::open(repo_path)?;

    println!("Ingesting commits from {:?}...", repo_path);
    let stats = repo.ingest(&db)?;

    println!(
        "✓ Ingested {} commits ({} already known)",
        stats.ingested, stats.skipped
    );
    Ok(())
}

fn print_persist_stats(stats: &PersistStats) {
    println!(
        "{} links written, {} already present",
        stats.links_inserted, stats.links_skipped
    );
    println!(
        "{} fix versions written, {} already present",
        stats.versions_inserted, stats.versions_skipped
    );
    println!(
        "{} release lines ordered, {} already present",
        stats.orders_inserted, stats.orders_skipped
    );
}
