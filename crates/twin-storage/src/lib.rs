//! # twin-storage
//!
//! Storage layer for TwinDB.
//!
//! Every table lives at exactly one site. The engine never touches files or
//! sockets directly: it talks to a [`SiteStorage`] capability, of which
//! there are three implementations:
//!
//! - [`FileStore`]: pipe-delimited files in a data directory (a site's own disk)
//! - [`RemoteStore`]: the counterpart site, reached through a [`SiteServer`]
//! - [`MemoryStore`]: an in-process store for tests and embedding
//!
//! ```text
//!   LOCAL process                              REMOTE machine
//! ┌───────────────┐                         ┌──────────────────┐
//! │    Session    │                         │    SiteServer    │
//! │  ┌─────────┐  │   frames over TCP       │  ┌────────────┐  │
//! │  │ Remote  │──┼────────────────────────▶│  │ FileStore  │  │
//! │  │ Store   │◀─┼─────────────────────────┼──│ (remote)   │  │
//! │  └─────────┘  │                         │  └────────────┘  │
//! │  ┌─────────┐  │                         └──────────────────┘
//! │  │FileStore│  │
//! │  │ (local) │  │
//! │  └─────────┘  │
//! └───────────────┘
//! ```
//!
//! The [`PendingLog`] holding buffered statements is always local to the
//! process.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod file;
pub mod layout;
pub mod memory;
pub mod pending;
pub mod remote;
pub mod site;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use pending::PendingLog;
pub use remote::{RemoteStore, SiteServer};
pub use site::SiteStorage;
