//! Full-table scans.
//!
//! There are no indexes: every lookup reads the whole table from its site.

use twin_common::Row;
use twin_sql::validate::BoundPredicate;
use twin_storage::{SiteStorage, StorageError};

use super::error::DatabaseResult;

/// A linear scan of one table at one site.
pub struct TableScan<'a> {
    store: &'a dyn SiteStorage,
    table: &'a str,
}

impl<'a> TableScan<'a> {
    /// Creates a scan.
    pub fn new(store: &'a dyn SiteStorage, table: &'a str) -> Self {
        Self { store, table }
    }

    /// Reads the header and every row.
    pub fn read(&self) -> DatabaseResult<ScannedTable> {
        let mut rows = self.store.read_data(self.table)?;
        if rows.is_empty() {
            return Err(StorageError::corrupted(self.table, "missing header row").into());
        }
        let header = rows.remove(0);
        Ok(ScannedTable { header, rows })
    }

    /// Reads every value of one column.
    pub fn column(&self, column: &str) -> DatabaseResult<Vec<String>> {
        Ok(self.store.read_column_values(self.table, column)?)
    }

    /// Returns true if any row holds `value` in `column`.
    pub fn contains(&self, column: &str, value: &str) -> DatabaseResult<bool> {
        Ok(self.column(column)?.iter().any(|v| v == value))
    }
}

/// The contents of a table at the time of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedTable {
    /// Column names.
    pub header: Row,
    /// Data rows in stored order.
    pub rows: Vec<Row>,
}

impl ScannedTable {
    /// Iterates the rows the predicate selects; `None` selects all.
    pub fn matching<'s>(
        &'s self,
        predicate: Option<&'s BoundPredicate>,
    ) -> impl Iterator<Item = &'s Row> + 's {
        self.rows
            .iter()
            .filter(move |row| predicate.map_or(true, |p| p.matches(row)))
    }

    /// Splits the rows into (selected, kept), each in stored order.
    pub fn partition(self, predicate: Option<&BoundPredicate>) -> (Vec<Row>, Vec<Row>) {
        self.rows
            .into_iter()
            .partition(|row| predicate.map_or(true, |p| p.matches(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twin_common::{Column, DataType, TableMetadata};
    use twin_storage::MemoryStore;

    fn store() -> MemoryStore {
        let store = MemoryStore::new("scan");
        let metadata = TableMetadata::new(
            "employee",
            vec![
                Column::new("id", DataType::Int).primary_key(),
                Column::new("dept", DataType::Int),
            ],
        );
        store.write_metadata(&metadata).unwrap();
        store
            .create_data("employee", &metadata.column_names())
            .unwrap();
        for row in [["1", "10"], ["2", "20"], ["3", "10"]] {
            let row: Vec<String> = row.iter().map(|f| f.to_string()).collect();
            store.write_data("employee", &row).unwrap();
        }
        store
    }

    #[test]
    fn test_read_splits_header() {
        let store = store();
        let scanned = TableScan::new(&store, "employee").read().unwrap();
        assert_eq!(scanned.header, vec!["id", "dept"]);
        assert_eq!(scanned.rows.len(), 3);
    }

    #[test]
    fn test_matching_and_partition_keep_order() {
        let store = store();
        let scanned = TableScan::new(&store, "employee").read().unwrap();
        let predicate = BoundPredicate {
            column: 1,
            value: "10".into(),
        };

        let ids: Vec<&str> = scanned
            .matching(Some(&predicate))
            .map(|row| row[0].as_str())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(scanned.matching(None).count(), 3);

        let (selected, kept) = scanned.partition(Some(&predicate));
        assert_eq!(selected, vec![vec!["1", "10"], vec!["3", "10"]]);
        assert_eq!(kept, vec![vec!["2", "20"]]);
    }

    #[test]
    fn test_contains() {
        let store = store();
        let scan = TableScan::new(&store, "employee");
        assert!(scan.contains("id", "2").unwrap());
        assert!(!scan.contains("id", "4").unwrap());
        assert!(scan.contains("nope", "1").is_err());
    }
}
