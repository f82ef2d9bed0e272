//! The site storage facade.

use twin_common::{DistributedCatalog, Row, Site, TableInfo, TableMetadata};

use crate::error::{StorageError, StorageResult};

/// Uniform operations on one site's tables and catalogs.
///
/// Implementations are selected by site and injected into the engine; the
/// engine never branches on where the bytes actually live.
///
/// `read_data` returns the header record (the column names) as its first
/// row. `delete_all_rows` keeps that header.
pub trait SiteStorage: Send + Sync {
    /// Short description for logs, e.g. the data directory or address.
    fn describe(&self) -> String;

    /// Reads the column definitions of a table.
    fn read_metadata(&self, table: &str) -> StorageResult<TableMetadata>;

    /// Writes the column definitions of a new table.
    fn write_metadata(&self, metadata: &TableMetadata) -> StorageResult<()>;

    /// Creates the data of a new table, holding only the header.
    fn create_data(&self, table: &str, header: &[String]) -> StorageResult<()>;

    /// Reads all rows, header first.
    fn read_data(&self, table: &str) -> StorageResult<Vec<Row>>;

    /// Appends one row.
    fn write_data(&self, table: &str, row: &[String]) -> StorageResult<()>;

    /// Removes every row but the header.
    fn delete_all_rows(&self, table: &str) -> StorageResult<()>;

    /// Removes the metadata and data of a table.
    fn delete_table_files(&self, table: &str) -> StorageResult<()>;

    /// Reads every value of one column, in row order, without the header.
    fn read_column_values(&self, table: &str, column: &str) -> StorageResult<Vec<String>> {
        let mut rows = self.read_data(table)?.into_iter();
        let header = rows
            .next()
            .ok_or_else(|| StorageError::corrupted(table, "missing header row"))?;
        let idx = header
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| StorageError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })?;
        Ok(rows
            .map(|mut row| {
                if idx < row.len() {
                    row.swap_remove(idx)
                } else {
                    String::new()
                }
            })
            .collect())
    }

    /// Adds one to the table's local catalog row count.
    fn increment_row_count(&self, table: &str) -> StorageResult<()>;

    /// Subtracts `n` from the table's local catalog row count.
    fn decrement_row_count(&self, table: &str, n: u64) -> StorageResult<()>;

    /// Reads the local catalog.
    fn read_local_catalog(&self) -> StorageResult<Vec<TableInfo>>;

    /// Adds or replaces a local catalog entry.
    fn write_local_catalog_entry(&self, info: &TableInfo) -> StorageResult<()>;

    /// Removes a local catalog entry.
    fn remove_local_catalog_entry(&self, table: &str) -> StorageResult<()>;

    /// Reads this site's copy of the distributed catalog.
    fn read_distributed_catalog(&self) -> StorageResult<DistributedCatalog>;

    /// Replaces this site's copy of the distributed catalog.
    fn write_distributed_catalog(&self, catalog: &DistributedCatalog) -> StorageResult<()>;

    /// Records the owning site of a table in this site's distributed catalog.
    fn write_catalog_entry(&self, table: &str, site: Site) -> StorageResult<()> {
        let mut catalog = self.read_distributed_catalog()?;
        catalog.insert(table, site);
        self.write_distributed_catalog(&catalog)
    }

    /// Releases any held connection. Later calls may reconnect.
    fn close(&self) {}
}
