//! # TwinDB Database Engine
//!
//! This module wires the pieces of a TwinDB process together:
//!
//! - SQL classification, parsing and validation (`twin-sql`)
//! - Site storage: the own file store and the counterpart (`twin-storage`)
//! - Key constraints across the site boundary
//! - The pending-transaction buffer
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          Database                              │
//! │   (own store, counterpart store, audit sink, pending log)      │
//! │                              │                                 │
//! │                              ▼                                 │
//! │                           Session                              │
//! │              (auto-commit flag, statement pipeline)            │
//! │                              │                                 │
//! │    ┌──────────────┬──────────┴─────────┬──────────────────┐    │
//! │    ▼              ▼                    ▼                  ▼    │
//! │ ┌────────────┐ ┌──────────────┐ ┌──────────────┐ ┌───────────┐ │
//! │ │SiteResolver│ │ Constraint   │ │  Executor    │ │Transaction│ │
//! │ │ + catalog  │ │ Engine       │ │ (TableScan)  │ │ Buffer    │ │
//! │ │   sync     │ │              │ │              │ │           │ │
//! │ └────────────┘ └──────────────┘ └──────────────┘ └───────────┘ │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! use twin_server::database::Database;
//!
//! let db = Database::open(config)?;
//! let mut session = db.create_session()?;
//!
//! session.execute("CREATE TABLE department NODE REMOTE (id INT PRIMARY KEY, name TEXT)")?;
//!
//! // Defer statements until COMMIT
//! session.execute("SET AUTO_COMMIT = FALSE")?;
//! session.execute("INSERT INTO department VALUES (1, 'Sales')")?;
//! session.execute("COMMIT")?;
//! ```

pub mod catalog;
pub mod constraints;
mod engine;
mod error;
pub mod executor;
mod result;
pub mod scan;
mod session;
pub mod transaction;

pub use catalog::{ResolvedTable, SchemaView, SiteResolver};
pub use engine::Database;
pub use error::{DatabaseError, DatabaseResult};
pub use result::{QueryResult, StatementResult};
pub use session::{Session, SessionCommand, SessionConfig, SessionId, SessionState};
pub use transaction::{TransactionBuffer, TransactionMode};
