//! Database schema definition

/// SQL schema for the tables this tool owns.
///
/// The issue-tracker tables (`issues`, `changes`, `issues_ext_jira`,
/// `issues_ext_bugzilla`) and the mined `scmlog` normally come from
/// restored backups; `scmlog` is also created here so a repository can be
/// ingested directly without a backup.
pub const SCHEMA: &str = r#"
-- Mined commit log (also populated by `issueminer ingest`)
CREATE TABLE IF NOT EXISTS scmlog (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rev TEXT UNIQUE,
    message TEXT NOT NULL,
    num_files INTEGER NOT NULL DEFAULT 0
);

-- Issue-to-commit links
CREATE TABLE IF NOT EXISTS issues_scmlog (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    issue_id INTEGER NOT NULL,
    scmlog_id INTEGER NOT NULL,
    UNIQUE (issue_id, scmlog_id)
);

CREATE INDEX IF NOT EXISTS idx_issues_scmlog_issue ON issues_scmlog(issue_id);
CREATE INDEX IF NOT EXISTS idx_issues_scmlog_commit ON issues_scmlog(scmlog_id);

-- Fix versions per linked issue, with the derived release line
CREATE TABLE IF NOT EXISTS issues_fix_version (
    issue_id INTEGER NOT NULL,
    fix_version TEXT NOT NULL,
    major_fix_version TEXT NOT NULL,
    UNIQUE (issue_id, fix_version)
);

CREATE INDEX IF NOT EXISTS idx_fix_version_issue ON issues_fix_version(issue_id);
CREATE INDEX IF NOT EXISTS idx_fix_version_major ON issues_fix_version(major_fix_version);

-- Natural rank of each release line, 1..=N with no gaps
CREATE TABLE IF NOT EXISTS issues_fix_version_order (
    major_fix_version TEXT NOT NULL,
    version_order INTEGER NOT NULL,
    UNIQUE (major_fix_version, version_order)
);

CREATE INDEX IF NOT EXISTS idx_fix_version_order_major ON issues_fix_version_order(major_fix_version);
"#;
