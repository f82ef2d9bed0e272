//! Audit trail.
//!
//! Every statement a session runs is recorded. Events and failures go to
//! the event log; execution times and database state go to the general
//! log. Lines look like:
//!
//! ```text
//! INFO | 19-10-2026 14:03:07 | [LOCAL] INSERT INTO department VALUES (1, 'Sales'): 1 row inserted into 'department'
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;
use tracing::warn;
use twin_common::{EVENT_LOG_FILE, GENERAL_LOG_FILE};

/// Receives audit records. Recording never fails the statement.
pub trait AuditSink: Send + Sync {
    /// Records something that happened.
    fn event(&self, message: &str);

    /// Records a failed statement or command.
    fn failure(&self, message: &str);

    /// Records a timing or state measurement.
    fn metric(&self, message: &str);
}

/// Writes the event and general logs of a log directory.
#[derive(Debug)]
pub struct FileAuditSink {
    event_log: PathBuf,
    general_log: PathBuf,
    lock: Mutex<()>,
}

impl FileAuditSink {
    /// Opens the logs in `dir`, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            event_log: dir.join(EVENT_LOG_FILE),
            general_log: dir.join(GENERAL_LOG_FILE),
            lock: Mutex::new(()),
        })
    }

    /// Returns the event log path.
    pub fn event_log(&self) -> &Path {
        &self.event_log
    }

    /// Returns the general log path.
    pub fn general_log(&self) -> &Path {
        &self.general_log
    }

    fn append(&self, path: &Path, level: &str, message: &str) {
        let line = format_line(level, message);
        let _guard = self.lock.lock();
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = result {
            warn!("Failed to write audit log {}: {}", path.display(), e);
        }
    }
}

impl AuditSink for FileAuditSink {
    fn event(&self, message: &str) {
        self.append(&self.event_log, "INFO", message);
    }

    fn failure(&self, message: &str) {
        self.append(&self.event_log, "ERROR", message);
    }

    fn metric(&self, message: &str) {
        self.append(&self.general_log, "INFO", message);
    }
}

/// Formats one audit line.
pub fn format_line(level: &str, message: &str) -> String {
    let message = message.replace(['\r', '\n'], " ");
    format!(
        "{} | {} | {}",
        level,
        Local::now().format("%d-%m-%Y %H:%M:%S"),
        message
    )
}

/// Kind of an in-memory audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    /// [`AuditSink::event`]
    Event,
    /// [`AuditSink::failure`]
    Failure,
    /// [`AuditSink::metric`]
    Metric,
}

/// Keeps audit records in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<(AuditKind, String)>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every record so far.
    pub fn records(&self) -> Vec<(AuditKind, String)> {
        self.records.lock().clone()
    }

    /// Returns the messages of one kind.
    pub fn messages(&self, kind: AuditKind) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn event(&self, message: &str) {
        self.records.lock().push((AuditKind::Event, message.to_string()));
    }

    fn failure(&self, message: &str) {
        self.records
            .lock()
            .push((AuditKind::Failure, message.to_string()));
    }

    fn metric(&self, message: &str) {
        self.records
            .lock()
            .push((AuditKind::Metric, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_line() {
        let line = format_line("ERROR", "bad\nthing");
        let parts: Vec<&str> = line.split(" | ").collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ERROR");
        // dd-MM-yyyy HH:mm:ss
        assert_eq!(parts[1].len(), 19);
        assert_eq!(&parts[1][2..3], "-");
        assert_eq!(parts[2], "bad thing");
    }

    #[test]
    fn test_file_sink_splits_logs() {
        let dir = TempDir::new().unwrap();
        let sink = FileAuditSink::open(dir.path().join("logs")).unwrap();

        sink.event("created department");
        sink.failure("duplicate key");
        sink.metric("execution time: 3 ms");

        let events = fs::read_to_string(sink.event_log()).unwrap();
        let lines: Vec<&str> = events.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("INFO | "));
        assert!(lines[0].ends_with("created department"));
        assert!(lines[1].starts_with("ERROR | "));

        let general = fs::read_to_string(sink.general_log()).unwrap();
        assert!(general.contains("execution time: 3 ms"));
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemoryAuditSink::new();
        sink.event("a");
        sink.failure("b");
        sink.metric("c");

        assert_eq!(sink.records().len(), 3);
        assert_eq!(sink.messages(AuditKind::Failure), vec!["b"]);
    }
}
