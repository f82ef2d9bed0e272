//! Primary and foreign key enforcement.
//!
//! Checks run against stored rows just before execution. Foreign keys may
//! cross the site boundary: a table whose site cannot be reached from this
//! process is left unchecked, with a warning.

use std::collections::HashSet;

use tracing::warn;
use twin_common::{DistributedCatalog, Row, Site, TableMetadata, NULL_FIELD};
use twin_sql::validate::BoundUpdate;
use twin_storage::{SiteStorage, StorageError};

use super::catalog::{ResolvedTable, SiteResolver};
use super::error::{DatabaseError, DatabaseResult};
use super::scan::TableScan;

/// A foreign key column of another table pointing at the checked table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChildReference {
    table: String,
    site: Site,
    column: String,
    referenced_column: String,
}

/// Key constraint checks against one catalog snapshot.
pub struct ConstraintEngine<'a> {
    sites: &'a SiteResolver,
    catalog: &'a DistributedCatalog,
}

impl<'a> ConstraintEngine<'a> {
    /// Creates an engine.
    pub fn new(sites: &'a SiteResolver, catalog: &'a DistributedCatalog) -> Self {
        Self { sites, catalog }
    }

    // =========================================================================
    // Statement checks
    // =========================================================================

    /// Checks a new row: its primary key must be new and every foreign key
    /// must point at an existing parent value.
    pub fn check_insert(&self, table: &ResolvedTable, row: &[String]) -> DatabaseResult<()> {
        let metadata = &table.metadata;

        if let Some((idx, pk)) = metadata.primary_key() {
            let value = field(row, idx);
            let scan = TableScan::new(self.sites.store_for(table.site)?, table.name());
            if value != NULL_FIELD && scan.contains(&pk.name, value)? {
                return Err(DatabaseError::PrimaryKeyViolation(format!(
                    "{}.{} already contains {}",
                    metadata.name, pk.name, value
                )));
            }
        }

        for (idx, column, reference) in metadata.foreign_keys() {
            self.check_parent_value(
                metadata,
                &column.name,
                &reference.table,
                &reference.column,
                field(row, idx),
            )?;
        }
        Ok(())
    }

    /// Checks an UPDATE against the current rows of its table.
    ///
    /// Assigning the primary key must touch at most one row and must not
    /// duplicate a stored value. Assigning a foreign key must point at an
    /// existing parent value. Values that the update makes disappear must
    /// not be referenced by any other table.
    pub fn check_update(
        &self,
        table: &ResolvedTable,
        update: &BoundUpdate,
        rows: &[Row],
    ) -> DatabaseResult<()> {
        let metadata = &table.metadata;
        let column = &metadata.columns[update.column];
        let affected: Vec<&Row> = rows
            .iter()
            .filter(|row| update.predicate.as_ref().map_or(true, |p| p.matches(row)))
            .collect();

        if column.is_primary_key() {
            if affected.len() > 1 {
                return Err(DatabaseError::PrimaryKeyViolation(format!(
                    "setting {}.{} to {} would touch {} rows",
                    metadata.name,
                    column.name,
                    update.value,
                    affected.len()
                )));
            }
            if rows.iter().any(|row| field(row, update.column) == update.value) {
                return Err(DatabaseError::PrimaryKeyViolation(format!(
                    "{}.{} already contains {}",
                    metadata.name, column.name, update.value
                )));
            }
        }

        if let Some(reference) = column.foreign_key() {
            self.check_parent_value(
                metadata,
                &column.name,
                &reference.table,
                &reference.column,
                &update.value,
            )?;
        }

        let changed: Vec<&Row> = affected
            .into_iter()
            .filter(|row| field(row, update.column) != update.value)
            .collect();
        self.check_children(metadata, &changed, Some(update.column))
    }

    /// Checks that none of the rows about to be deleted is referenced.
    pub fn check_delete(&self, table: &ResolvedTable, removed: &[&Row]) -> DatabaseResult<()> {
        self.check_children(&table.metadata, removed, None)
    }

    /// Checks that no other table references `table` at all.
    pub fn check_drop(&self, table: &str) -> DatabaseResult<()> {
        match self.children_of(table)?.first() {
            Some(child) => Err(DatabaseError::ForeignKeyViolation(format!(
                "table '{}' is referenced by {}.{}",
                table, child.table, child.column
            ))),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Reference lookups
    // =========================================================================

    fn check_parent_value(
        &self,
        child: &TableMetadata,
        column: &str,
        parent: &str,
        parent_column: &str,
        value: &str,
    ) -> DatabaseResult<()> {
        if value == NULL_FIELD {
            return Ok(());
        }

        let site = self.catalog.site_of(parent).ok_or_else(|| {
            DatabaseError::ForeignKeyViolation(format!(
                "{}.{} references missing table '{}'",
                child.name, column, parent
            ))
        })?;
        let Some(store) = self.reachable(site, parent) else {
            return Ok(());
        };

        if !TableScan::new(store, parent).contains(parent_column, value)? {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "{} is not present in {}({}) referenced by {}.{}",
                value, parent, parent_column, child.name, column
            )));
        }
        Ok(())
    }

    /// Rejects if any child row references a value of `removed` rows. With
    /// `only_column`, just references to that parent column count.
    fn check_children(
        &self,
        parent: &TableMetadata,
        removed: &[&Row],
        only_column: Option<usize>,
    ) -> DatabaseResult<()> {
        if removed.is_empty() {
            return Ok(());
        }

        for child in self.children_of(&parent.name)? {
            let Some(idx) = parent.column_index(&child.referenced_column) else {
                continue;
            };
            if only_column.is_some_and(|c| c != idx) {
                continue;
            }

            let disappearing: HashSet<&str> = removed
                .iter()
                .map(|row| field(row, idx))
                .filter(|value| *value != NULL_FIELD)
                .collect();
            if disappearing.is_empty() {
                continue;
            }

            let Some(store) = self.reachable(child.site, &child.table) else {
                continue;
            };
            let values = TableScan::new(store, &child.table).column(&child.column)?;
            if let Some(value) = values.iter().find(|v| disappearing.contains(v.as_str())) {
                return Err(DatabaseError::ForeignKeyViolation(format!(
                    "{}({}) = {} is still referenced by {}.{}",
                    parent.name, child.referenced_column, value, child.table, child.column
                )));
            }
        }
        Ok(())
    }

    /// Every foreign key column of another catalogued table pointing at
    /// `parent`.
    fn children_of(&self, parent: &str) -> DatabaseResult<Vec<ChildReference>> {
        let mut children = Vec::new();

        for (table, site) in self.catalog.iter() {
            if table == parent {
                continue;
            }
            let Some(store) = self.reachable(site, table) else {
                continue;
            };
            let metadata = match store.read_metadata(table) {
                Ok(metadata) => metadata,
                Err(StorageError::TableNotFound(_)) => {
                    warn!("Table '{}' has no metadata at {}; skipping", table, site);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            children.extend(
                metadata
                    .foreign_keys()
                    .filter(|(_, _, reference)| reference.table == parent)
                    .map(|(_, column, reference)| ChildReference {
                        table: table.to_string(),
                        site,
                        column: column.name.clone(),
                        referenced_column: reference.column.clone(),
                    }),
            );
        }
        Ok(children)
    }

    fn reachable(&self, site: Site, table: &str) -> Option<&'a dyn SiteStorage> {
        let store = self.sites.try_store_for(site);
        if store.is_none() {
            warn!(
                "Table '{}' lives at {} which {} cannot reach; skipping its check",
                table,
                site,
                self.sites.current_site()
            );
        }
        store
    }
}

fn field(row: &[String], idx: usize) -> &str {
    row.get(idx).map_or(NULL_FIELD, String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use twin_common::{Column, DataType, TableInfo};
    use twin_sql::validate::BoundPredicate;
    use twin_storage::MemoryStore;

    fn strings(fields: &[&str]) -> Row {
        fields.iter().map(|f| f.to_string()).collect()
    }

    fn department() -> TableMetadata {
        TableMetadata::new(
            "department",
            vec![
                Column::new("id", DataType::Int).primary_key(),
                Column::new("name", DataType::Text),
            ],
        )
    }

    fn employee() -> TableMetadata {
        TableMetadata::new(
            "employee",
            vec![
                Column::new("id", DataType::Int).primary_key(),
                Column::new("dept", DataType::Int).references("department", "id"),
            ],
        )
    }

    fn create(store: &MemoryStore, site: Site, metadata: &TableMetadata, rows: &[Row]) {
        store.write_metadata(metadata).unwrap();
        store
            .create_data(&metadata.name, &metadata.column_names())
            .unwrap();
        store
            .write_local_catalog_entry(&TableInfo::new(metadata.name.clone()))
            .unwrap();
        for row in rows {
            store.write_data(&metadata.name, row).unwrap();
        }
        store.write_catalog_entry(&metadata.name, site).unwrap();
    }

    /// department at REMOTE with ids 1 and 2; employee at LOCAL with one
    /// employee in department 1.
    fn setup() -> (SiteResolver, Arc<MemoryStore>, Arc<MemoryStore>) {
        let local = Arc::new(MemoryStore::new("local"));
        let remote = Arc::new(MemoryStore::new("remote"));
        create(
            &remote,
            Site::Remote,
            &department(),
            &[strings(&["1", "Sales"]), strings(&["2", "Ops"])],
        );
        local
            .write_distributed_catalog(&remote.read_distributed_catalog().unwrap())
            .unwrap();
        create(&local, Site::Local, &employee(), &[strings(&["100", "1"])]);

        let sites = SiteResolver::new(
            Site::Local,
            local.clone(),
            Some(remote.clone() as Arc<dyn SiteStorage>),
        );
        (sites, local, remote)
    }

    fn resolved(site: Site, metadata: TableMetadata) -> ResolvedTable {
        ResolvedTable { site, metadata }
    }

    #[test]
    fn test_duplicate_primary_key_rejected() {
        let (sites, _, _) = setup();
        let catalog = sites.catalog().unwrap();
        let engine = ConstraintEngine::new(&sites, &catalog);
        let table = resolved(Site::Remote, department());

        let err = engine
            .check_insert(&table, &strings(&["1", "Other"]))
            .unwrap_err();
        assert!(matches!(err, DatabaseError::PrimaryKeyViolation(_)));
        assert!(engine.check_insert(&table, &strings(&["3", "New"])).is_ok());
    }

    #[test]
    fn test_dangling_foreign_key_rejected() {
        let (sites, _, _) = setup();
        let catalog = sites.catalog().unwrap();
        let engine = ConstraintEngine::new(&sites, &catalog);
        let table = resolved(Site::Local, employee());

        let err = engine
            .check_insert(&table, &strings(&["101", "9"]))
            .unwrap_err();
        assert!(matches!(err, DatabaseError::ForeignKeyViolation(_)));
        assert!(engine.check_insert(&table, &strings(&["101", "2"])).is_ok());
        assert!(engine
            .check_insert(&table, &strings(&["102", NULL_FIELD]))
            .is_ok());
    }

    #[test]
    fn test_referenced_parent_delete_rejected() {
        let (sites, _, remote) = setup();
        let catalog = sites.catalog().unwrap();
        let engine = ConstraintEngine::new(&sites, &catalog);
        let table = resolved(Site::Remote, department());
        let rows = TableScan::new(&*remote, "department")
            .read()
            .unwrap()
            .rows;

        let err = engine.check_delete(&table, &[&rows[0]]).unwrap_err();
        assert!(matches!(err, DatabaseError::ForeignKeyViolation(_)));
        assert!(engine.check_delete(&table, &[&rows[1]]).is_ok());
    }

    #[test]
    fn test_multi_row_primary_key_update_rejected() {
        let (sites, _, remote) = setup();
        let catalog = sites.catalog().unwrap();
        let engine = ConstraintEngine::new(&sites, &catalog);
        let table = resolved(Site::Remote, department());
        let rows = TableScan::new(&*remote, "department")
            .read()
            .unwrap()
            .rows;

        let update = BoundUpdate {
            column: 0,
            value: "7".into(),
            predicate: None,
        };
        let err = engine.check_update(&table, &update, &rows).unwrap_err();
        assert!(matches!(err, DatabaseError::PrimaryKeyViolation(_)));
    }

    #[test]
    fn test_primary_key_update_checks_children() {
        let (sites, _, remote) = setup();
        let catalog = sites.catalog().unwrap();
        let engine = ConstraintEngine::new(&sites, &catalog);
        let table = resolved(Site::Remote, department());
        let rows = TableScan::new(&*remote, "department")
            .read()
            .unwrap()
            .rows;

        let referenced = BoundUpdate {
            column: 0,
            value: "7".into(),
            predicate: Some(BoundPredicate {
                column: 0,
                value: "1".into(),
            }),
        };
        assert!(matches!(
            engine.check_update(&table, &referenced, &rows),
            Err(DatabaseError::ForeignKeyViolation(_))
        ));

        let unreferenced = BoundUpdate {
            column: 0,
            value: "7".into(),
            predicate: Some(BoundPredicate {
                column: 0,
                value: "2".into(),
            }),
        };
        assert!(engine.check_update(&table, &unreferenced, &rows).is_ok());

        let duplicate = BoundUpdate {
            column: 0,
            value: "1".into(),
            predicate: Some(BoundPredicate {
                column: 0,
                value: "2".into(),
            }),
        };
        assert!(matches!(
            engine.check_update(&table, &duplicate, &rows),
            Err(DatabaseError::PrimaryKeyViolation(_))
        ));
    }

    #[test]
    fn test_drop_of_referenced_table_rejected() {
        let (sites, _, _) = setup();
        let catalog = sites.catalog().unwrap();
        let engine = ConstraintEngine::new(&sites, &catalog);

        assert!(matches!(
            engine.check_drop("department"),
            Err(DatabaseError::ForeignKeyViolation(_))
        ));
        assert!(engine.check_drop("employee").is_ok());
    }

    #[test]
    fn test_unreachable_parent_is_skipped() {
        let (_, local, remote) = setup();
        // A REMOTE process cannot see employee, which lives at LOCAL.
        remote
            .write_distributed_catalog(&local.read_distributed_catalog().unwrap())
            .unwrap();
        let sites = SiteResolver::new(Site::Remote, remote.clone(), None);
        let catalog = sites.catalog().unwrap();
        let engine = ConstraintEngine::new(&sites, &catalog);

        assert!(engine.check_drop("department").is_ok());
    }
}
