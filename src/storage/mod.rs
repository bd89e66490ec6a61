//! SQLite storage layer
//!
//! This module handles the mined data store:
//! - Schema bootstrap for the link and version tables
//! - The commit corpus and issue-count queries
//! - The SQL-backed issue resolver (jira and bugzilla flavors)
//! - Report persistence with duplicate-skip semantics
//! - Statement-by-statement script execution (post-restore optimization)

mod schema;

pub use schema::SCHEMA;

use crate::link::{split_fix_versions, Commit, IssueResolver, LinkRunReport, ResolvedIssue, VersionTag};
use crate::pattern::TrackerKind;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", path.as_ref()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Initialize the database schema
    fn initialize(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        Ok(())
    }

    // ==================== Tracker Detection ====================

    /// Which tracker the restored issue tables came from.
    ///
    /// A bugzilla dump carries an `issues_ext_bugzilla` table; everything
    /// else is treated as jira.
    pub fn tracker_kind(&self) -> Result<TrackerKind> {
        let bugzilla: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'issues_ext_bugzilla'",
                [],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to probe tracker tables")?;

        Ok(if bugzilla.is_some() {
            TrackerKind::Bugzilla
        } else {
            TrackerKind::Jira
        })
    }

    // ==================== Commit Corpus ====================

    /// Commits touching at most `max_files` files.
    pub fn commits(&self, max_files: u32) -> Result<Vec<Commit>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, message FROM scmlog WHERE num_files <= ?1")?;

        let rows = stmt.query_map(params![max_files], |row| {
            Ok(Commit {
                id: row.get(0)?,
                message: row.get(1)?,
            })
        })?;

        let mut commits = Vec::new();
        for row in rows {
            commits.push(row?);
        }

        Ok(commits)
    }

    /// Insert one mined commit; returns false when the revision is
    /// already present.
    pub fn insert_commit(&self, rev: &str, message: &str, num_files: u32) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO scmlog (rev, message, num_files) VALUES (?1, ?2, ?3)",
                params![rev, message, num_files],
            )
            .context("Failed to insert commit")?;

        Ok(inserted > 0)
    }

    pub fn count_commits(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(1) FROM scmlog", [], |row| row.get(0))
            .context("Failed to count commits")?;
        Ok(count as u64)
    }

    pub fn count_issues(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(1) FROM issues", [], |row| row.get(0))
            .context("Failed to count issues")?;
        Ok(count as u64)
    }

    // ==================== Issue Lookup ====================

    /// SQL-backed resolver for the given tracker kind.
    pub fn resolver(&self, kind: TrackerKind) -> DbIssueResolver<'_> {
        DbIssueResolver {
            conn: &self.conn,
            kind,
        }
    }

    /// Fix-version strings recorded on every issue in the store, keyed by
    /// issue id and split into tokens. Used to recompute version tables
    /// without re-linking.
    pub fn issue_fix_versions(&self) -> Result<BTreeMap<i64, Vec<String>>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT i.id, iej.fix_version
               FROM issues i
               JOIN issues_ext_jira iej ON iej.issue_id = i.id",
        )?;

        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let raw: Option<String> = row.get(1)?;
            Ok((id, raw.unwrap_or_default()))
        })?;

        let mut versions = BTreeMap::new();
        for row in rows {
            let (id, raw) = row?;
            versions.insert(id, split_fix_versions(&raw));
        }

        Ok(versions)
    }

    // ==================== Report Persistence ====================

    /// Write the link set and derived version rows.
    ///
    /// Every insert is `OR IGNORE`: a row that already exists is counted
    /// as a skip, never an error, so re-running a link pass over a
    /// populated store is harmless.
    pub fn persist_report(&mut self, report: &LinkRunReport) -> Result<PersistStats> {
        let tags = report.version_tags();
        let order = report.version_order();

        let tx = self.conn.transaction()?;
        let mut stats = PersistStats::default();

        for link in &report.links {
            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO issues_scmlog (issue_id, scmlog_id) VALUES (?1, ?2)",
                    params![link.issue_id, link.commit_id],
                )
                .context("Failed to insert link")?;
            if inserted > 0 {
                stats.links_inserted += 1;
            } else {
                stats.links_skipped += 1;
                tracing::debug!(
                    issue = link.issue_id,
                    commit = link.commit_id,
                    "link already stored"
                );
            }
        }

        insert_version_rows(&tx, &tags, &order, &mut stats)?;

        tx.commit().context("Failed to commit link run")?;
        Ok(stats)
    }

    /// Write version tag and order rows only (the `versions` command).
    pub fn persist_versions(
        &mut self,
        tags: &[VersionTag],
        order: &[(String, u32)],
    ) -> Result<PersistStats> {
        let tx = self.conn.transaction()?;
        let mut stats = PersistStats::default();

        insert_version_rows(&tx, tags, order, &mut stats)?;

        tx.commit().context("Failed to commit version rows")?;
        Ok(stats)
    }

    // ==================== Scripts ====================

    /// Execute a SQL script one statement at a time, substituting `{0}`
    /// with the project name. A failing statement is logged and skipped;
    /// returns the number of statements that ran.
    pub fn run_script(&self, script: &str, project: &str) -> Result<usize> {
        let mut executed = 0;
        for raw in script.split(';') {
            let statement = raw.replace("{0}", project);
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }

            match self.conn.execute_batch(&format!("{};", statement)) {
                Ok(()) => executed += 1,
                Err(e) => tracing::warn!(error = %e, statement, "script statement skipped"),
            }
        }
        Ok(executed)
    }

    /// Run the bundled post-restore optimization script.
    pub fn optimize(&self, project: &str) -> Result<usize> {
        self.run_script(include_str!("optimize.sql"), project)
    }
}

/// Outcome of writing one report; inserted/skipped per table.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PersistStats {
    pub links_inserted: usize,
    pub links_skipped: usize,
    pub versions_inserted: usize,
    pub versions_skipped: usize,
    pub orders_inserted: usize,
    pub orders_skipped: usize,
}

fn insert_version_rows(
    tx: &Transaction<'_>,
    tags: &[VersionTag],
    order: &[(String, u32)],
    stats: &mut PersistStats,
) -> Result<()> {
    for tag in tags {
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO issues_fix_version (issue_id, fix_version, major_fix_version) \
                 VALUES (?1, ?2, ?3)",
                params![tag.issue_id, tag.fix_version, tag.major_group],
            )
            .context("Failed to insert fix version")?;
        if inserted > 0 {
            stats.versions_inserted += 1;
        } else {
            stats.versions_skipped += 1;
            tracing::debug!(
                issue = tag.issue_id,
                version = %tag.fix_version,
                "fix version already stored"
            );
        }
    }

    for (group, rank) in order {
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO issues_fix_version_order (major_fix_version, version_order) \
                 VALUES (?1, ?2)",
                params![group, rank],
            )
            .context("Failed to insert version order")?;
        if inserted > 0 {
            stats.orders_inserted += 1;
        } else {
            stats.orders_skipped += 1;
            tracing::debug!(group = %group, rank, "version order already stored");
        }
    }

    Ok(())
}

/// Issue lookup against the restored tracker tables.
///
/// Jira resolution requires the issue to be resolved as Fixed with a
/// matching resolution-change audit row; bugzilla looks up the bare
/// number. Either way the lookup yields at most one issue.
pub struct DbIssueResolver<'a> {
    conn: &'a Connection,
    kind: TrackerKind,
}

impl IssueResolver for DbIssueResolver<'_> {
    fn resolve(&self, issue_key: &str) -> Result<Option<ResolvedIssue>> {
        match self.kind {
            TrackerKind::Jira => self
                .conn
                .query_row(
                    "SELECT DISTINCT i.id, iej.fix_version
                       FROM issues i
                       JOIN changes c ON c.issue_id = i.id
                       JOIN issues_ext_jira iej ON iej.issue_id = i.id
                      WHERE UPPER(iej.issue_key) = ?1
                        AND i.resolution = 'Fixed'
                        AND c.field = 'Resolution'
                        AND c.new_value = i.resolution",
                    params![issue_key.to_uppercase()],
                    |row| {
                        let fix_versions: Option<String> = row.get(1)?;
                        Ok(ResolvedIssue {
                            issue_id: row.get(0)?,
                            raw_fix_versions: fix_versions.unwrap_or_default(),
                        })
                    },
                )
                .optional()
                .with_context(|| format!("Issue lookup failed for '{}'", issue_key)),
            TrackerKind::Bugzilla => {
                // Bugzilla keys are bare numbers; a non-numeric key cannot
                // be in the store.
                let Ok(number) = issue_key.parse::<i64>() else {
                    return Ok(None);
                };
                self.conn
                    .query_row(
                        "SELECT id FROM issues WHERE issue = ?1",
                        params![number],
                        |row| {
                            Ok(ResolvedIssue {
                                issue_id: row.get(0)?,
                                raw_fix_versions: String::new(),
                            })
                        },
                    )
                    .optional()
                    .with_context(|| format!("Issue lookup failed for '{}'", issue_key))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Linker;
    use crate::pattern::IssueReferencePattern;

    /// Restored-jira-dump stand-in: tracker tables plus a few commits.
    fn seed_jira(db: &Database) {
        db.conn
            .execute_batch(
                r#"
                CREATE TABLE issues (id INTEGER PRIMARY KEY, resolution TEXT);
                CREATE TABLE changes (issue_id INTEGER, field TEXT, new_value TEXT);
                CREATE TABLE issues_ext_jira (issue_id INTEGER, issue_key TEXT, fix_version TEXT);

                INSERT INTO issues VALUES (10, 'Fixed'), (20, 'Fixed'), (30, 'Duplicate');
                INSERT INTO changes VALUES
                    (10, 'Resolution', 'Fixed'),
                    (20, 'Resolution', 'Fixed'),
                    (30, 'Resolution', 'Duplicate');
                INSERT INTO issues_ext_jira VALUES
                    (10, 'ARIES-1', '1.2,1.3'),
                    (20, 'ARIES-2', ''),
                    (30, 'ARIES-3', '2.0');

                INSERT INTO scmlog (id, rev, message, num_files) VALUES
                    (1, 'a1', 'ARIES-1: fix the registry' || char(10), 3),
                    (2, 'a2', 'Follow-up for aries-1 and ARIES-2 ' || char(10), 2),
                    (3, 'a3', 'ARIES-3 was closed as duplicate ' || char(10), 1),
                    (4, 'a4', 'huge refactor touching everything' || char(10), 100);
                "#,
            )
            .unwrap();
    }

    fn seed_bugzilla(db: &Database) {
        db.conn
            .execute_batch(
                r#"
                CREATE TABLE issues (id INTEGER PRIMARY KEY, issue INTEGER);
                CREATE TABLE issues_ext_bugzilla (issue_id INTEGER);
                INSERT INTO issues VALUES (7, 123);
                "#,
            )
            .unwrap();
    }

    #[test]
    fn test_tracker_detection() {
        let db = Database::open_in_memory().unwrap();
        seed_jira(&db);
        assert_eq!(db.tracker_kind().unwrap(), TrackerKind::Jira);

        let db = Database::open_in_memory().unwrap();
        seed_bugzilla(&db);
        assert_eq!(db.tracker_kind().unwrap(), TrackerKind::Bugzilla);
    }

    #[test]
    fn test_commit_corpus_respects_file_filter() {
        let db = Database::open_in_memory().unwrap();
        seed_jira(&db);

        let commits = db.commits(20).unwrap();
        assert_eq!(commits.len(), 3);
        assert_eq!(db.count_commits().unwrap(), 4);
        assert_eq!(db.count_issues().unwrap(), 3);
    }

    #[test]
    fn test_jira_resolver_requires_fixed_resolution_audit() {
        let db = Database::open_in_memory().unwrap();
        seed_jira(&db);
        let resolver = db.resolver(TrackerKind::Jira);

        let hit = resolver.resolve("ARIES-1").unwrap().unwrap();
        assert_eq!(hit.issue_id, 10);
        assert_eq!(hit.raw_fix_versions, "1.2,1.3");

        // Case-insensitive on the key.
        assert!(resolver.resolve("aries-2").unwrap().is_some());
        // Closed as duplicate, not Fixed: not resolvable.
        assert!(resolver.resolve("ARIES-3").unwrap().is_none());
        assert!(resolver.resolve("ARIES-99").unwrap().is_none());
    }

    #[test]
    fn test_bugzilla_resolver_looks_up_bare_numbers() {
        let db = Database::open_in_memory().unwrap();
        seed_bugzilla(&db);
        let resolver = db.resolver(TrackerKind::Bugzilla);

        let hit = resolver.resolve("123").unwrap().unwrap();
        assert_eq!(hit.issue_id, 7);
        assert_eq!(hit.raw_fix_versions, "");
        assert!(resolver.resolve("999").unwrap().is_none());
        assert!(resolver.resolve("not-a-number").unwrap().is_none());
    }

    #[test]
    fn test_persist_report_is_idempotent() {
        let mut db = Database::open_in_memory().unwrap();
        seed_jira(&db);

        let pattern = IssueReferencePattern::jira("aries").unwrap();
        let report = {
            let resolver = db.resolver(TrackerKind::Jira);
            let linker = Linker::new(&pattern, &resolver);
            linker.link_all(db.commits(20).unwrap()).unwrap()
        };

        let first = db.persist_report(&report).unwrap();
        assert_eq!(first.links_inserted, 3);
        assert_eq!(first.links_skipped, 0);
        assert_eq!(first.versions_inserted, 2);
        assert_eq!(first.orders_inserted, 2);

        let second = db.persist_report(&report).unwrap();
        assert_eq!(second.links_inserted, 0);
        assert_eq!(second.versions_inserted, 0);
        assert_eq!(second.orders_inserted, 0);
        assert_eq!(second.links_skipped, 3);
        assert_eq!(second.versions_skipped, 2);
        assert_eq!(second.orders_skipped, 2);
    }

    #[test]
    fn test_link_run_against_seeded_store() {
        let db = Database::open_in_memory().unwrap();
        seed_jira(&db);

        let pattern = IssueReferencePattern::jira("aries").unwrap();
        let resolver = db.resolver(TrackerKind::Jira);
        let linker = Linker::new(&pattern, &resolver);
        let report = linker.link_all(db.commits(20).unwrap()).unwrap();

        assert_eq!(report.commits_examined, 3);
        assert_eq!(report.commits_with_match, 3);
        assert_eq!(report.pattern_occurrences, 4);
        // ARIES-3 resolves to nothing; the rest link.
        assert_eq!(report.occurrences_linked, 3);
        assert_eq!(report.linked_issues.len(), 2);
        assert_eq!(report.issues_with_fix_version(), 1);
    }

    #[test]
    fn test_issue_fix_versions_for_recompute() {
        let db = Database::open_in_memory().unwrap();
        seed_jira(&db);

        let versions = db.issue_fix_versions().unwrap();
        assert_eq!(versions.get(&10).unwrap(), &vec!["1.2", "1.3"]);
        assert!(versions.get(&20).unwrap().is_empty());
        assert_eq!(versions.get(&30).unwrap(), &vec!["2.0"]);
    }

    #[test]
    fn test_run_script_skips_failing_statements() {
        let db = Database::open_in_memory().unwrap();
        let executed = db
            .run_script(
                "CREATE TABLE t_{0} (x INTEGER); SELECT broken FROM missing; ANALYZE",
                "demo",
            )
            .unwrap();
        assert_eq!(executed, 2);

        // The placeholder was substituted before execution.
        let count: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(1) FROM sqlite_master WHERE name = 't_demo'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_optimize_runs_bundled_script() {
        let db = Database::open_in_memory().unwrap();
        seed_jira(&db);
        // Every statement applies once the tracker tables exist.
        assert_eq!(db.optimize("aries").unwrap(), 7);
    }

    #[test]
    fn test_insert_commit_skips_known_revision() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.insert_commit("abc", "first\n", 1).unwrap());
        assert!(!db.insert_commit("abc", "first\n", 1).unwrap());
        assert_eq!(db.count_commits().unwrap(), 1);
    }
}
