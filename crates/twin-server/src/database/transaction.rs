//! Deferred statement buffering.
//!
//! With auto-commit off, validated mutating statements are not executed
//! but appended to the pending-transaction log. COMMIT replays the log,
//! ROLLBACK discards it.

use tracing::info;
use twin_storage::PendingLog;

use super::error::DatabaseResult;

/// How a session handles mutating statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Execute each statement immediately.
    AutoCommit,
    /// Append each statement to the pending log.
    Buffered,
}

impl TransactionMode {
    /// Returns the mode for an auto-commit flag value.
    pub fn from_auto_commit(auto_commit: bool) -> Self {
        if auto_commit {
            Self::AutoCommit
        } else {
            Self::Buffered
        }
    }
}

/// The pending statements of a session.
#[derive(Debug, Clone)]
pub struct TransactionBuffer {
    log: PendingLog,
}

impl TransactionBuffer {
    /// Wraps a pending log.
    pub fn new(log: PendingLog) -> Self {
        Self { log }
    }

    /// Appends a statement.
    pub fn push(&self, statement: &str) -> DatabaseResult<()> {
        self.log.append(statement)?;
        Ok(())
    }

    /// Returns the pending statements in order.
    pub fn pending(&self) -> DatabaseResult<Vec<String>> {
        Ok(self.log.entries()?)
    }

    /// Returns the number of pending statements.
    pub fn len(&self) -> DatabaseResult<usize> {
        Ok(self.log.len()?)
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> DatabaseResult<bool> {
        Ok(self.log.is_empty()?)
    }

    /// Empties the log and returns how many statements it held.
    pub fn clear(&self) -> DatabaseResult<usize> {
        let discarded = self.log.len()?;
        self.log.clear()?;
        if discarded > 0 {
            info!(
                "Cleared {} pending statements from {}",
                discarded,
                self.log.path().display()
            );
        }
        Ok(discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(
            TransactionMode::from_auto_commit(true),
            TransactionMode::AutoCommit
        );
        assert_eq!(
            TransactionMode::from_auto_commit(false),
            TransactionMode::Buffered
        );
    }

    #[test]
    fn test_push_and_clear() {
        let dir = TempDir::new().unwrap();
        let buffer =
            TransactionBuffer::new(PendingLog::open(dir.path().join("transaction.txt")).unwrap());

        buffer.push("INSERT INTO t VALUES (1)").unwrap();
        buffer.push("INSERT INTO t VALUES (2)").unwrap();
        assert_eq!(
            buffer.pending().unwrap(),
            vec!["INSERT INTO t VALUES (1)", "INSERT INTO t VALUES (2)"]
        );

        assert_eq!(buffer.clear().unwrap(), 2);
        assert!(buffer.is_empty().unwrap());
        assert_eq!(buffer.clear().unwrap(), 0);
    }
}
