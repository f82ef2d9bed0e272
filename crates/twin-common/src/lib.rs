//! # twin-common
//!
//! Common types, configuration, and error codes for TwinDB.
//!
//! This crate provides the foundational types shared by every TwinDB
//! component:
//!
//! - **Types**: sites, column/table schema, catalog entries
//! - **Errors**: the stable `ErrorCode` taxonomy
//! - **Config**: site configuration loaded from TOML
//! - **Constants**: file names, file headers and protocol defaults
//!
//! ## Example
//!
//! ```rust
//! use twin_common::types::{Column, DataType, Site, TableMetadata};
//!
//! let table = TableMetadata::new(
//!     "department",
//!     vec![
//!         Column::new("id", DataType::Int).primary_key(),
//!         Column::new("name", DataType::Text),
//!     ],
//! );
//! assert_eq!(table.primary_key().map(|(idx, _)| idx), Some(0));
//! assert_eq!(Site::Local.counterpart(), Site::Remote);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::SiteConfig;
pub use constants::*;
pub use error::{ErrorClass, ErrorCode};
pub use types::{
    Column, ConstraintKind, DataType, DistributedCatalog, ForeignKeyRef, Row, Site, TableInfo,
    TableMetadata,
};
