//! Main database engine.
//!
//! The `Database` struct is the top-level entry point for a TwinDB process.
//! It owns the site stores and the audit sink and hands out the session.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;
use twin_common::{Site, SiteConfig, ERD_FILE, PENDING_LOG_FILE, SQL_DUMP_FILE};
use twin_storage::{FileStore, PendingLog, RemoteStore, SiteStorage};

use super::catalog::SiteResolver;
use super::error::{DatabaseError, DatabaseResult};
use super::session::{Session, SessionConfig, SessionId};
use super::transaction::TransactionBuffer;
use crate::audit::{AuditSink, FileAuditSink};
use crate::export;

/// The main database engine.
pub struct Database {
    /// Configuration.
    config: SiteConfig,
    /// This process's own store.
    own: Arc<dyn SiteStorage>,
    /// The counterpart site; only a LOCAL process has one.
    counterpart: Option<Arc<dyn SiteStorage>>,
    /// Audit trail.
    audit: Arc<dyn AuditSink>,
    /// Pending-transaction log.
    pending: PendingLog,
    /// Set while a session is open.
    session_open: Arc<AtomicBool>,
    /// Next session ID.
    next_session_id: AtomicU64,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("site", &self.config.current_site)
            .field("own", &self.own.describe())
            .field("counterpart", &self.counterpart.as_ref().map(|s| s.describe()))
            .finish()
    }
}

impl Database {
    /// Opens a database: a file store over `data_dir`, file audit logs and,
    /// for a LOCAL process, a client for the REMOTE daemon.
    pub fn open(config: SiteConfig) -> DatabaseResult<Self> {
        config
            .validate()
            .map_err(|e| DatabaseError::Config(format!("{e:#}")))?;

        let own: Arc<dyn SiteStorage> = Arc::new(FileStore::open(&config.data_dir)?);
        let counterpart: Option<Arc<dyn SiteStorage>> = match config.current_site {
            Site::Local => Some(Arc::new(RemoteStore::new(config.remote.addr()))),
            Site::Remote => None,
        };
        let audit = Arc::new(FileAuditSink::open(config.effective_log_dir())?);

        info!(
            "Opened {} site at {}",
            config.current_site,
            config.data_dir.display()
        );
        Self::with_stores(config, own, counterpart, audit)
    }

    /// Creates a database over the given stores. The pending log still
    /// lives in `config.data_dir`.
    pub fn with_stores(
        config: SiteConfig,
        own: Arc<dyn SiteStorage>,
        counterpart: Option<Arc<dyn SiteStorage>>,
        audit: Arc<dyn AuditSink>,
    ) -> DatabaseResult<Self> {
        let pending = PendingLog::open(config.data_dir.join(PENDING_LOG_FILE))?;

        Ok(Self {
            config,
            own,
            counterpart,
            audit,
            pending,
            session_open: Arc::new(AtomicBool::new(false)),
            next_session_id: AtomicU64::new(1),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Returns the site this process runs as.
    pub fn current_site(&self) -> Site {
        self.config.current_site
    }

    /// Returns the audit sink.
    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    /// Returns a resolver over this process's stores.
    pub fn sites(&self) -> SiteResolver {
        SiteResolver::new(
            self.config.current_site,
            Arc::clone(&self.own),
            self.counterpart.clone(),
        )
    }

    /// Opens the session. Only one session may be open at a time.
    pub fn create_session(&self) -> DatabaseResult<Session> {
        if self
            .session_open
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DatabaseError::InvalidState(
                "a session is already open".to_string(),
            ));
        }

        let id = SessionId::new(self.next_session_id.fetch_add(1, Ordering::SeqCst));
        let config = SessionConfig {
            auto_commit: self.config.auto_commit,
        };
        info!("Opened {} at {} site", id, self.config.current_site);

        Ok(Session::new(
            id,
            config,
            self.sites(),
            TransactionBuffer::new(self.pending.clone()),
            Arc::clone(&self.audit),
            Arc::clone(&self.session_open),
        ))
    }

    /// Writes the CREATE statements of every table to `sql_dump.sql` in the
    /// data directory.
    pub fn export_sql_dump(&self) -> DatabaseResult<PathBuf> {
        let sites = self.sites();
        sites.refresh();
        let path = self.config.data_dir.join(SQL_DUMP_FILE);
        std::fs::write(&path, export::sql_dump(&sites)?)?;
        self.audit
            .event(&format!("[{}] SQL dump written to {}", sites.current_site(), path.display()));
        Ok(path)
    }

    /// Writes the foreign key relations of every table to `erd.txt` in the
    /// data directory.
    pub fn export_erd(&self) -> DatabaseResult<PathBuf> {
        let sites = self.sites();
        sites.refresh();
        let path = self.config.data_dir.join(ERD_FILE);
        std::fs::write(&path, export::erd(&sites)?)?;
        self.audit
            .event(&format!("[{}] ERD written to {}", sites.current_site(), path.display()));
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use tempfile::TempDir;
    use twin_storage::MemoryStore;

    fn local_config(dir: &TempDir) -> SiteConfig {
        SiteConfig::builder()
            .current_site(Site::Local)
            .data_dir(dir.path())
            .build()
    }

    fn memory_database(dir: &TempDir) -> Database {
        Database::with_stores(
            local_config(dir),
            Arc::new(MemoryStore::new("local")),
            Some(Arc::new(MemoryStore::new("remote")) as Arc<dyn SiteStorage>),
            Arc::new(MemoryAuditSink::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_single_session() {
        let dir = TempDir::new().unwrap();
        let db = memory_database(&dir);

        let mut session = db.create_session().unwrap();
        assert!(matches!(
            db.create_session(),
            Err(DatabaseError::InvalidState(_))
        ));

        session.close();
        let next = db.create_session().unwrap();
        assert_eq!(next.id().as_u64(), 2);
    }

    #[test]
    fn test_session_dropped_releases_slot() {
        let dir = TempDir::new().unwrap();
        let db = memory_database(&dir);

        drop(db.create_session().unwrap());
        assert!(db.create_session().is_ok());
    }

    #[test]
    fn test_open_remote_site_on_disk() {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig::builder()
            .current_site(Site::Remote)
            .data_dir(dir.path().join("data"))
            .build();

        let db = Database::open(config).unwrap();
        let mut session = db.create_session().unwrap();
        session
            .execute("CREATE TABLE department (id INT PRIMARY KEY, name TEXT)")
            .unwrap();
        session
            .execute("INSERT INTO department VALUES (1, 'Sales')")
            .unwrap();

        let data = std::fs::read_to_string(dir.path().join("data").join("department.dat")).unwrap();
        assert_eq!(data.lines().collect::<Vec<_>>(), vec!["id|name", "1|Sales"]);

        let events = std::fs::read_to_string(dir.path().join("data/logs/event.log")).unwrap();
        assert_eq!(events.lines().count(), 2);
    }

    #[test]
    fn test_exports_are_written() {
        let dir = TempDir::new().unwrap();
        let db = memory_database(&dir);
        let mut session = db.create_session().unwrap();
        session
            .execute("CREATE TABLE department NODE REMOTE (id INT PRIMARY KEY)")
            .unwrap();

        let dump = db.export_sql_dump().unwrap();
        assert!(std::fs::read_to_string(dump)
            .unwrap()
            .contains("CREATE TABLE department NODE REMOTE (id INT PRIMARY KEY);"));

        let erd = db.export_erd().unwrap();
        assert_eq!(
            std::fs::read_to_string(erd).unwrap(),
            "department is not associated with any table\n"
        );
    }
}
