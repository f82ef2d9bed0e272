//! # twin-server
//!
//! Session engine and site daemon for TwinDB.
//!
//! This crate provides:
//!
//! - **Database Engine**: wires a site's own store, the counterpart site
//!   and the audit trail together and hands out the single session.
//!
//! - **Session**: drives every statement through classification, parsing,
//!   validation, site resolution, constraint checks and execution, and
//!   keeps the auto-commit flag and the pending-transaction buffer.
//!
//! - **Audit**: event and general logs of everything a session does.
//!
//! - **Export**: SQL dump and entity-relationship listing of the catalog.
//!
//! - **Site daemon**: the `twind` binary serving a site's files to its
//!   counterpart.
//!
//! # Quick Start
//!
//! ```ignore
//! use twin_common::SiteConfig;
//! use twin_server::database::Database;
//!
//! let db = Database::open(SiteConfig::from_file("twin.toml".as_ref())?)?;
//! let mut session = db.create_session()?;
//!
//! session.execute("CREATE TABLE department (id INT PRIMARY KEY, name TEXT)")?;
//! session.execute("INSERT INTO department VALUES (1, 'Sales')")?;
//!
//! let result = session.execute("SELECT * FROM department")?;
//! println!("{}", result.display());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Audit trail sinks.
pub mod audit;

/// Daemon configuration.
pub mod config;

/// Database engine - sessions, constraint checks and execution.
pub mod database;

/// Schema export (SQL dump, ERD).
pub mod export;

pub use audit::{AuditSink, FileAuditSink, MemoryAuditSink};
pub use config::DaemonConfig;
pub use database::{
    Database, DatabaseError, DatabaseResult, QueryResult, Session, SessionId, StatementResult,
};
