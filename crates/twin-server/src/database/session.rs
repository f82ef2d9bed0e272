//! Session management.
//!
//! A session drives each statement through the pipeline:
//!
//! ```text
//! text ─▶ classify ─▶ parse ─▶ validate ─▶ resolve site ─▶ check keys ─▶ execute
//!                                                    │
//!                                 auto-commit off ───┴──▶ pending log
//! ```
//!
//! The LOCAL process refreshes its catalog copy from REMOTE before each
//! statement and publishes it back afterwards. Session commands
//! (`SET AUTO_COMMIT`, `COMMIT`, `ROLLBACK`) are handled here and never
//! reach the parser.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use twin_common::{DistributedCatalog, Row, Site};
use twin_sql::validate::{BoundCreate, BoundDelete, BoundInsert, BoundSelect, BoundUpdate};
use twin_sql::{ParseError, Parser, Statement, StatementKind, Validator};

use super::catalog::{ResolvedTable, SchemaView, SiteResolver};
use super::constraints::ConstraintEngine;
use super::error::{DatabaseError, DatabaseResult};
use super::executor::Executor;
use super::result::StatementResult;
use super::scan::TableScan;
use super::transaction::{TransactionBuffer, TransactionMode};
use crate::audit::AuditSink;

/// Unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates a new session ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting statements.
    Active,
    /// Closed; the connection to the counterpart is released.
    Closed,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Execute mutating statements immediately.
    pub auto_commit: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { auto_commit: true }
    }
}

/// Commands handled by the session itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// `SET AUTO_COMMIT = TRUE|FALSE`
    SetAutoCommit(bool),
    /// `COMMIT`
    Commit,
    /// `ROLLBACK`
    Rollback,
}

impl SessionCommand {
    /// Recognizes a session command. `None` means the text is a statement.
    pub fn parse(text: &str) -> Option<DatabaseResult<Self>> {
        let text = text.trim().trim_end_matches(';').trim();
        let mut words = text.split_whitespace();
        let first = words.next()?.to_ascii_uppercase();

        match first.as_str() {
            "COMMIT" if words.next().is_none() => Some(Ok(Self::Commit)),
            "ROLLBACK" if words.next().is_none() => Some(Ok(Self::Rollback)),
            "SET" => {
                let setting = words.collect::<String>().to_ascii_uppercase();
                Some(match setting.as_str() {
                    "AUTO_COMMIT=TRUE" => Ok(Self::SetAutoCommit(true)),
                    "AUTO_COMMIT=FALSE" => Ok(Self::SetAutoCommit(false)),
                    _ => Err(DatabaseError::InvalidCommand(format!(
                        "{text} (expected SET AUTO_COMMIT = TRUE|FALSE)"
                    ))),
                })
            }
            _ => None,
        }
    }
}

/// A statement that passed validation, with its target resolved.
enum Prepared {
    Create(BoundCreate),
    Insert(ResolvedTable, BoundInsert),
    Update(ResolvedTable, BoundUpdate),
    Delete(ResolvedTable, BoundDelete),
    Select(ResolvedTable, BoundSelect),
    Drop(ResolvedTable),
    Truncate(ResolvedTable),
}

/// The single session of a TwinDB process.
pub struct Session {
    /// Session ID.
    id: SessionId,
    /// Current state.
    state: SessionState,
    /// Session configuration.
    config: SessionConfig,
    /// Own and counterpart stores.
    sites: SiteResolver,
    /// Pending statements while auto-commit is off.
    buffer: TransactionBuffer,
    /// Audit trail.
    audit: Arc<dyn AuditSink>,
    /// Number of statements executed.
    statement_count: u64,
    /// When the session was opened.
    created_at: Instant,
    /// Set while this session is the open one.
    open_flag: Arc<AtomicBool>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        config: SessionConfig,
        sites: SiteResolver,
        buffer: TransactionBuffer,
        audit: Arc<dyn AuditSink>,
        open_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            state: SessionState::Active,
            config,
            sites,
            buffer,
            audit,
            statement_count: 0,
            created_at: Instant::now(),
            open_flag,
        }
    }

    /// Returns the session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true if the session is closed.
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Returns the auto-commit flag.
    pub fn auto_commit(&self) -> bool {
        self.config.auto_commit
    }

    /// Returns how mutating statements are handled.
    pub fn mode(&self) -> TransactionMode {
        TransactionMode::from_auto_commit(self.config.auto_commit)
    }

    /// Returns the site this process runs as.
    pub fn current_site(&self) -> Site {
        self.sites.current_site()
    }

    /// Returns the site stores.
    pub fn sites(&self) -> &SiteResolver {
        &self.sites
    }

    /// Returns the number of statements executed.
    pub fn statement_count(&self) -> u64 {
        self.statement_count
    }

    /// Returns how long the session has been open.
    pub fn uptime(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Returns the statements waiting for COMMIT.
    pub fn pending_statements(&self) -> DatabaseResult<Vec<String>> {
        self.buffer.pending()
    }

    fn ensure_open(&self) -> DatabaseResult<()> {
        if self.is_closed() {
            return Err(DatabaseError::InvalidState(format!(
                "{} is closed",
                self.id
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Transaction Control
    // =========================================================================

    /// Sets the auto-commit flag. Pending statements stay pending.
    pub fn set_auto_commit(&mut self, enabled: bool) -> StatementResult {
        self.config.auto_commit = enabled;
        info!("Auto-commit {}", if enabled { "enabled" } else { "disabled" });
        StatementResult::AutoCommit(enabled)
    }

    /// Replays every pending statement with auto-commit forced on, then
    /// clears the log. A failing statement is reported and the replay goes
    /// on.
    pub fn commit(&mut self) -> DatabaseResult<StatementResult> {
        self.ensure_open()?;

        let pending = self.buffer.pending()?;
        let mut replayed = 0;
        let mut failures = Vec::new();

        for statement in &pending {
            match self.run_statement(statement, TransactionMode::AutoCommit) {
                Ok(_) => replayed += 1,
                Err(e) => {
                    warn!("Replay of '{}' failed: {}", statement, e);
                    failures.push(format!("{statement}: {e}"));
                }
            }
        }

        self.buffer.clear()?;
        info!(
            "Committed {} statements ({} failed)",
            replayed,
            failures.len()
        );
        Ok(StatementResult::Committed { replayed, failures })
    }

    /// Discards every pending statement.
    pub fn rollback(&mut self) -> DatabaseResult<StatementResult> {
        self.ensure_open()?;
        let discarded = self.buffer.clear()?;
        Ok(StatementResult::RolledBack { discarded })
    }

    // =========================================================================
    // Statement Execution
    // =========================================================================

    /// Executes one statement or session command.
    pub fn execute(&mut self, text: &str) -> DatabaseResult<StatementResult> {
        self.ensure_open()?;
        self.statement_count += 1;
        let text = text.trim();

        match SessionCommand::parse(text) {
            Some(command) => {
                let start = Instant::now();
                let result = command.and_then(|command| self.execute_command(command));
                self.record(text, &result, start);
                result
            }
            None => self.run_statement(text, self.mode()),
        }
    }

    fn execute_command(&mut self, command: SessionCommand) -> DatabaseResult<StatementResult> {
        match command {
            SessionCommand::SetAutoCommit(enabled) => Ok(self.set_auto_commit(enabled)),
            SessionCommand::Commit => self.commit(),
            SessionCommand::Rollback => self.rollback(),
        }
    }

    /// Runs one statement between a catalog refresh and publish, and
    /// records it in the audit trail.
    fn run_statement(&self, text: &str, mode: TransactionMode) -> DatabaseResult<StatementResult> {
        let start = Instant::now();
        self.sites.refresh();
        let result = self.process(text, mode);
        self.sites.publish();
        self.record(text, &result, start);
        result
    }

    fn process(&self, text: &str, mode: TransactionMode) -> DatabaseResult<StatementResult> {
        if text.is_empty() {
            return Err(ParseError::EmptyStatement.into());
        }

        let kind = StatementKind::classify(text);
        let statement = Parser::parse_kind(kind, text)?;
        let catalog = self.sites.catalog()?;
        let prepared = self.prepare(&statement, &catalog)?;

        if mode == TransactionMode::Buffered
            && kind.is_mutating()
            && kind != StatementKind::Truncate
        {
            self.buffer.push(text)?;
            debug!("Buffered {} statement", kind);
            return Ok(StatementResult::Buffered { kind });
        }

        self.run(prepared, &catalog)
    }

    /// Semantic validation and site resolution.
    fn prepare(
        &self,
        statement: &Statement,
        catalog: &DistributedCatalog,
    ) -> DatabaseResult<Prepared> {
        let view = SchemaView::new(&self.sites, catalog);

        let prepared = match statement {
            Statement::CreateTable(stmt) => {
                let bound = Validator::validate_create(stmt, self.sites.current_site(), &view)?;
                self.sites.store_for(bound.site)?;
                Prepared::Create(bound)
            }
            Statement::Insert(stmt) => {
                let table = view.resolve(&stmt.table)?;
                let bound = Validator::validate_insert(stmt, &table.metadata)?;
                Prepared::Insert(table, bound)
            }
            Statement::Update(stmt) => {
                let table = view.resolve(&stmt.table)?;
                let bound = Validator::validate_update(stmt, &table.metadata)?;
                Prepared::Update(table, bound)
            }
            Statement::Delete(stmt) => {
                let table = view.resolve(&stmt.table)?;
                let bound = Validator::validate_delete(stmt, &table.metadata)?;
                Prepared::Delete(table, bound)
            }
            Statement::Select(stmt) => {
                let table = view.resolve(&stmt.table)?;
                let bound = Validator::validate_select(stmt, &table.metadata)?;
                Prepared::Select(table, bound)
            }
            Statement::DropTable(name) => Prepared::Drop(view.resolve(name)?),
            Statement::TruncateTable(name) => Prepared::Truncate(view.resolve(name)?),
        };
        Ok(prepared)
    }

    /// Constraint checks and execution.
    fn run(&self, prepared: Prepared, catalog: &DistributedCatalog) -> DatabaseResult<StatementResult> {
        let constraints = ConstraintEngine::new(&self.sites, catalog);
        let own = self.sites.own();

        match prepared {
            Prepared::Create(bound) => {
                Executor::new(self.sites.store_for(bound.site)?, own).create(&bound)
            }
            Prepared::Insert(table, bound) => {
                constraints.check_insert(&table, &bound.row)?;
                Executor::new(self.sites.store_for(table.site)?, own).insert(table.name(), &bound)
            }
            Prepared::Update(table, bound) => {
                let store = self.sites.store_for(table.site)?;
                let scanned = TableScan::new(store, table.name()).read()?;
                constraints.check_update(&table, &bound, &scanned.rows)?;
                Executor::new(store, own).update(table.name(), &bound, scanned)
            }
            Prepared::Delete(table, bound) => {
                let store = self.sites.store_for(table.site)?;
                let scanned = TableScan::new(store, table.name()).read()?;
                let removed: Vec<&Row> = scanned.matching(bound.predicate.as_ref()).collect();
                constraints.check_delete(&table, &removed)?;
                Executor::new(store, own).delete(table.name(), bound.predicate.as_ref(), scanned)
            }
            Prepared::Select(table, bound) => {
                let store = self.sites.store_for(table.site)?;
                let scanned = TableScan::new(store, table.name()).read()?;
                Ok(Executor::new(store, own).select(&table.metadata, &bound, &scanned))
            }
            Prepared::Drop(table) => {
                constraints.check_drop(table.name())?;
                Executor::new(self.sites.store_for(table.site)?, own).drop_table(table.name())
            }
            Prepared::Truncate(table) => {
                let store = self.sites.store_for(table.site)?;
                let scanned = TableScan::new(store, table.name()).read()?;
                let removed: Vec<&Row> = scanned.rows.iter().collect();
                constraints.check_delete(&table, &removed)?;
                Executor::new(store, own).truncate(table.name(), scanned)
            }
        }
    }

    // =========================================================================
    // Audit
    // =========================================================================

    fn record(&self, text: &str, result: &DatabaseResult<StatementResult>, start: Instant) {
        let site = self.sites.current_site();
        match result {
            Ok(outcome) => {
                let summary = match outcome.as_query() {
                    Some(query) => format!("{} rows returned", query.len()),
                    None => outcome.display(),
                };
                debug!("{}: {}", text, summary);
                self.audit.event(&format!("[{site}] {text}: {summary}"));
            }
            Err(e) => {
                debug!("{} failed: {}", text, e);
                self.audit
                    .failure(&format!("[{site}] {text}: {} ({})", e, e.class()));
            }
        }

        self.audit.metric(&format!(
            "[{site}] Execution time of '{text}': {} ms",
            start.elapsed().as_millis()
        ));
        self.audit
            .metric(&format!("[{site}] Database state: {}", self.database_state()));
    }

    /// Row counts per table per reachable site.
    pub fn database_state(&self) -> String {
        let current = self.sites.current_site();
        let stores = [
            (current, Some(self.sites.own())),
            (current.counterpart(), self.sites.counterpart()),
        ];

        stores
            .into_iter()
            .filter_map(|(site, store)| store.map(|store| (site, store)))
            .map(|(site, store)| match store.read_local_catalog() {
                Ok(tables) if tables.is_empty() => format!("{site}: no tables"),
                Ok(tables) => {
                    let counts: Vec<String> = tables
                        .iter()
                        .map(|t| format!("{}={} rows", t.name, t.row_count))
                        .collect();
                    format!("{site}: {}", counts.join(", "))
                }
                Err(e) => format!("{site}: unavailable ({e})"),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Closes the session. Pending statements are rolled back and the
    /// counterpart connection is released.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }

        match self.buffer.clear() {
            Ok(0) => {}
            Ok(discarded) => {
                info!("Rolled back {} pending statements on close", discarded);
                self.audit.event(&format!(
                    "[{}] Implicit rollback of {} pending statements",
                    self.sites.current_site(),
                    discarded
                ));
            }
            Err(e) => warn!("Failed to roll back pending statements: {}", e),
        }

        self.sites.close();
        self.state = SessionState::Closed;
        self.open_flag.store(false, Ordering::SeqCst);
        debug!("{} closed after {} statements", self.id, self.statement_count);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
