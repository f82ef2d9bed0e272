//! Statement execution against a site store.
//!
//! Each statement kind has exactly one strategy. Rows are rewritten by
//! truncating the table to its header and appending the survivors, so row
//! order is preserved.

use tracing::{debug, info};
use twin_common::{Row, TableInfo, TableMetadata};
use twin_sql::validate::{BoundCreate, BoundInsert, BoundPredicate, BoundSelect, BoundUpdate};
use twin_storage::SiteStorage;

use super::error::DatabaseResult;
use super::result::{QueryResult, StatementResult};
use super::scan::ScannedTable;

/// Runs validated, constraint-checked statements.
pub struct Executor<'a> {
    /// Store holding the target table.
    store: &'a dyn SiteStorage,
    /// This process's own store, holding its distributed catalog copy.
    catalog: &'a dyn SiteStorage,
}

impl<'a> Executor<'a> {
    /// Creates an executor for tables in `store`.
    pub fn new(store: &'a dyn SiteStorage, catalog: &'a dyn SiteStorage) -> Self {
        Self { store, catalog }
    }

    /// CREATE TABLE: metadata, header-only data, both catalog entries.
    pub fn create(&self, bound: &BoundCreate) -> DatabaseResult<StatementResult> {
        let name = &bound.metadata.name;

        self.store.write_metadata(&bound.metadata)?;
        self.store
            .create_data(name, &bound.metadata.column_names())?;
        self.catalog.write_catalog_entry(name, bound.site)?;
        self.store
            .write_local_catalog_entry(&TableInfo::new(name.clone()))?;

        info!("Created table '{}' at {}", name, bound.site);
        Ok(StatementResult::Created {
            table: name.clone(),
            site: bound.site,
        })
    }

    /// INSERT: append the full row and count it.
    pub fn insert(&self, table: &str, bound: &BoundInsert) -> DatabaseResult<StatementResult> {
        self.store.write_data(table, &bound.row)?;
        self.store.increment_row_count(table)?;

        debug!("Inserted into '{}': {:?}", table, bound.row);
        Ok(StatementResult::Inserted {
            table: table.to_string(),
        })
    }

    /// UPDATE: rewrite matching rows in place.
    pub fn update(
        &self,
        table: &str,
        bound: &BoundUpdate,
        scanned: ScannedTable,
    ) -> DatabaseResult<StatementResult> {
        let mut updated = 0;
        let rows: Vec<Row> = scanned
            .rows
            .into_iter()
            .map(|mut row| {
                let selected = bound.predicate.as_ref().map_or(true, |p| p.matches(&row));
                if selected && bound.column < row.len() {
                    row[bound.column] = bound.value.clone();
                    updated += 1;
                }
                row
            })
            .collect();

        if updated > 0 {
            self.rewrite(table, &rows)?;
        }

        debug!("Updated {} rows of '{}'", updated, table);
        Ok(StatementResult::Updated {
            table: table.to_string(),
            rows: updated,
        })
    }

    /// DELETE: keep the rows the predicate does not select.
    pub fn delete(
        &self,
        table: &str,
        predicate: Option<&BoundPredicate>,
        scanned: ScannedTable,
    ) -> DatabaseResult<StatementResult> {
        let removed = self.remove_rows(table, predicate, scanned)?;
        Ok(StatementResult::Deleted {
            table: table.to_string(),
            rows: removed,
        })
    }

    /// TRUNCATE: DELETE without a predicate.
    pub fn truncate(&self, table: &str, scanned: ScannedTable) -> DatabaseResult<StatementResult> {
        let removed = self.remove_rows(table, None, scanned)?;
        Ok(StatementResult::Truncated {
            table: table.to_string(),
            rows: removed,
        })
    }

    /// SELECT: project and filter the scanned rows.
    pub fn select(
        &self,
        metadata: &TableMetadata,
        bound: &BoundSelect,
        scanned: &ScannedTable,
    ) -> StatementResult {
        let columns = bound
            .columns
            .iter()
            .map(|&idx| metadata.columns[idx].name.clone())
            .collect();
        let rows = scanned
            .matching(bound.predicate.as_ref())
            .map(|row| {
                bound
                    .columns
                    .iter()
                    .map(|&idx| row.get(idx).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        StatementResult::Query(QueryResult::new(columns, rows))
    }

    /// DROP TABLE: files, distributed and local catalog entries.
    pub fn drop_table(&self, table: &str) -> DatabaseResult<StatementResult> {
        self.store.delete_table_files(table)?;

        let mut catalog = self.catalog.read_distributed_catalog()?;
        catalog.remove(table);
        self.catalog.write_distributed_catalog(&catalog)?;
        self.store.remove_local_catalog_entry(table)?;

        info!("Dropped table '{}'", table);
        Ok(StatementResult::Dropped {
            table: table.to_string(),
        })
    }

    fn remove_rows(
        &self,
        table: &str,
        predicate: Option<&BoundPredicate>,
        scanned: ScannedTable,
    ) -> DatabaseResult<usize> {
        let (removed, kept) = scanned.partition(predicate);
        if removed.is_empty() {
            return Ok(0);
        }

        self.rewrite(table, &kept)?;
        self.store
            .decrement_row_count(table, removed.len() as u64)?;

        debug!("Deleted {} rows of '{}'", removed.len(), table);
        Ok(removed.len())
    }

    /// Truncates to the header and appends `rows` in order.
    fn rewrite(&self, table: &str, rows: &[Row]) -> DatabaseResult<()> {
        self.store.delete_all_rows(table)?;
        for row in rows {
            self.store.write_data(table, row)?;
        }
        Ok(())
    }
}
