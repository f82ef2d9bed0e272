//! Pending-transaction log.
//!
//! Statements accepted while auto-commit is off are appended here, one per
//! line, and replayed or discarded as a whole. The file survives a crash;
//! a later COMMIT replays whatever it still holds.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StorageResult;

/// A durable, ordered queue of raw statements.
#[derive(Debug, Clone)]
pub struct PendingLog {
    path: PathBuf,
}

impl PendingLog {
    /// Opens the log at `path`, creating an empty file if needed.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path })
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one statement. Line breaks inside it are flattened so the
    /// statement stays on a single line.
    pub fn append(&self, statement: &str) -> StorageResult<()> {
        let line = statement.replace(['\r', '\n'], " ");
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line.trim())?;
        debug!("Buffered statement: {}", line.trim());
        Ok(())
    }

    /// Returns the buffered statements in log order.
    pub fn entries(&self) -> StorageResult<Vec<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Returns the number of buffered statements.
    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.entries()?.len())
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Truncates the log to empty.
    pub fn clear(&self) -> StorageResult<()> {
        fs::write(&self.path, "")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_clear() {
        let dir = TempDir::new().unwrap();
        let log = PendingLog::open(dir.path().join("transaction.txt")).unwrap();
        assert!(log.is_empty().unwrap());

        log.append("INSERT INTO t VALUES (1)").unwrap();
        log.append("INSERT INTO t\nVALUES (2);").unwrap();

        assert_eq!(
            log.entries().unwrap(),
            vec!["INSERT INTO t VALUES (1)", "INSERT INTO t VALUES (2);"]
        );

        log.clear().unwrap();
        assert!(log.is_empty().unwrap());
        assert_eq!(fs::read_to_string(log.path()).unwrap(), "");
    }

    #[test]
    fn test_reopen_keeps_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transaction.txt");
        PendingLog::open(&path).unwrap().append("DELETE FROM t").unwrap();

        let reopened = PendingLog::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
    }
}
