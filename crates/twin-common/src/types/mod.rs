//! Type definitions for TwinDB.
//!
//! This module contains the schema, site and catalog types shared by the
//! storage layer, the statement layer and the engine.

mod catalog;
mod schema;
mod site;

pub use catalog::{DistributedCatalog, TableInfo};
pub use schema::{Column, ConstraintKind, DataType, ForeignKeyRef, Row, TableMetadata};
pub use site::{ParseSiteError, Site};

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
