//! Backup restore collaborator
//!
//! Loads SQL dumps into the project database by feeding them to an
//! external `sqlite3` process. The wait is a cancellable future bounded
//! by an explicit timeout; a run that overshoots is killed and reported
//! as such rather than left hanging.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Default budget for one restore, matching the historical 10 minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Failure modes of a restore run.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("backup file not found: {0}")]
    BackupNotFound(PathBuf),

    #[error("restore process failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("restore timed out after {0:?}")]
    Timeout(Duration),

    #[error("restore process exited with {0}")]
    Failed(ExitStatus),
}

/// Restores SQL dumps into a database via an external client process.
pub struct BackupRestorer {
    command: String,
    timeout: Duration,
}

impl BackupRestorer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            command: "sqlite3".to_string(),
            timeout,
        }
    }

    /// Override the client binary (used by tests).
    #[cfg(test)]
    fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Feed one dump file into the database.
    pub async fn restore(&self, dump: &Path, database: &Path) -> Result<(), RestoreError> {
        if !dump.exists() {
            return Err(RestoreError::BackupNotFound(dump.to_path_buf()));
        }

        tracing::info!(dump = %dump.display(), database = %database.display(), "restoring backup");

        let input = std::fs::File::open(dump)?;
        let mut child = Command::new(&self.command)
            .arg(database)
            .stdin(Stdio::from(input))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(RestoreError::Failed(status))
                }
            }
            Err(_) => {
                child.start_kill()?;
                let _ = child.wait().await;
                Err(RestoreError::Timeout(self.timeout))
            }
        }
    }

    /// Restore the `<project>_issues.sql` and `<project>_vcs.sql` pair
    /// from a backups directory. Both files must exist before either is
    /// restored.
    pub async fn restore_pair(
        &self,
        backups_dir: &Path,
        project: &str,
        database: &Path,
    ) -> Result<(), RestoreError> {
        let issues = backups_dir.join(format!("{}_issues.sql", project));
        let vcs = backups_dir.join(format!("{}_vcs.sql", project));

        for dump in [&issues, &vcs] {
            if !dump.exists() {
                return Err(RestoreError::BackupNotFound(dump.clone()));
            }
        }

        self.restore(&issues, database).await?;
        self.restore(&vcs, database).await?;
        Ok(())
    }
}

impl Default for BackupRestorer {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_missing_backup_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let restorer = BackupRestorer::default();

        let result = runtime().block_on(restorer.restore(
            &dir.path().join("nowhere.sql"),
            &dir.path().join("out.db"),
        ));
        assert!(matches!(result, Err(RestoreError::BackupNotFound(_))));
    }

    #[test]
    fn test_restore_pair_checks_both_files_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("demo_issues.sql"), "SELECT 1;").unwrap();
        // demo_vcs.sql is missing; nothing should be restored.
        let restorer = BackupRestorer::default();

        let result = runtime().block_on(restorer.restore_pair(
            dir.path(),
            "demo",
            &dir.path().join("demo.db"),
        ));
        match result {
            Err(RestoreError::BackupNotFound(path)) => {
                assert!(path.ends_with("demo_vcs.sql"));
            }
            other => panic!("expected BackupNotFound, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_failing_process_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("demo_issues.sql");
        std::fs::write(&dump, "SELECT 1;").unwrap();

        // `false` ignores its argument and exits non-zero.
        let restorer = BackupRestorer::new(Duration::from_secs(5)).with_command("false");
        let result = runtime().block_on(restorer.restore(&dump, &dir.path().join("out.db")));
        assert!(matches!(result, Err(RestoreError::Failed(_))));
    }

    #[test]
    fn test_stuck_process_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("demo_issues.sql");
        std::fs::write(&dump, "-- unread by the stuck process\n").unwrap();

        // The "database" argument is a script that sleeps well past the
        // budget; `sh` stands in for a wedged restore client.
        let script = dir.path().join("stuck.sh");
        let mut file = std::fs::File::create(&script).unwrap();
        writeln!(file, "sleep 30").unwrap();
        drop(file);

        let restorer = BackupRestorer::new(Duration::from_millis(100)).with_command("sh");
        let result = runtime().block_on(restorer.restore(&dump, &script));
        assert!(matches!(result, Err(RestoreError::Timeout(_))));
    }
}
