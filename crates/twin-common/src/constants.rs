//! System-wide constants for TwinDB.
//!
//! File names and headers below define the on-disk layout shared by both
//! sites. Changing any of them breaks compatibility with existing data
//! directories.

// =============================================================================
// Field Encoding
// =============================================================================

/// Delimiter between fields of every stored record.
pub const FIELD_DELIMITER: char = '|';

/// Literal stored for an absent value.
pub const NULL_FIELD: &str = "null";

// =============================================================================
// Data Directory Layout
// =============================================================================

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "twin_data";

/// Name of the log directory inside the data directory.
pub const LOG_DIR_NAME: &str = "logs";

/// Distributed catalog file (table name to owning site).
pub const DISTRIBUTED_CATALOG_FILE: &str = "distributed_data_dictionary.dat";

/// Local catalog file (table name to row count and creation time).
pub const LOCAL_CATALOG_FILE: &str = "local_data_dictionary.dat";

/// Pending-transaction log file.
pub const PENDING_LOG_FILE: &str = "transaction.txt";

/// Extension of per-table metadata files.
pub const METADATA_EXTENSION: &str = "metadata";

/// Extension of per-table data files.
pub const DATA_EXTENSION: &str = "dat";

/// Event log file, inside the log directory.
pub const EVENT_LOG_FILE: &str = "event.log";

/// General (metrics and state) log file, inside the log directory.
pub const GENERAL_LOG_FILE: &str = "general.log";

/// SQL dump export file.
pub const SQL_DUMP_FILE: &str = "sql_dump.sql";

/// Entity-relation export file.
pub const ERD_FILE: &str = "erd.txt";

// =============================================================================
// File Headers
// =============================================================================

/// Header row of the distributed catalog.
pub const DISTRIBUTED_CATALOG_HEADER: &str = "TableName|DatabaseSite";

/// Header row of the local catalog.
pub const LOCAL_CATALOG_HEADER: &str = "TableName|NumberOfRows|CreatedOn";

/// Header row of a table metadata file.
pub const METADATA_HEADER: &str =
    "ColumnName|ColumnType|Constraint|ForeignKeyTable|ForeignKeyColumn";

// =============================================================================
// Network Defaults
// =============================================================================

/// Default host of the remote site daemon.
pub const DEFAULT_REMOTE_HOST: &str = "127.0.0.1";

/// Default port of the remote site daemon.
pub const DEFAULT_REMOTE_PORT: u16 = 7878;

/// Returns the metadata file name for a table.
#[must_use]
pub fn metadata_file_name(table: &str) -> String {
    format!("{table}.{METADATA_EXTENSION}")
}

/// Returns the data file name for a table.
#[must_use]
pub fn data_file_name(table: &str) -> String {
    format!("{table}.{DATA_EXTENSION}")
}
