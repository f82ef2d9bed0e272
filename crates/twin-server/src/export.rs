//! Schema exports: a SQL dump of CREATE statements and a text ERD.
//!
//! Both walk the distributed catalog and read each table's metadata from
//! the site that owns it. Tables at an unreachable site are left out.

use tracing::warn;
use twin_common::{ConstraintKind, Site, TableMetadata};
use twin_sql::parser::{ColumnConstraint, ColumnDef, CreateTableStatement, Statement};

use crate::database::{DatabaseResult, SiteResolver};

/// Renders the CREATE statement of every reachable table, oldest first.
pub fn sql_dump(sites: &SiteResolver) -> DatabaseResult<String> {
    let mut tables: Vec<(i64, Site, TableMetadata)> = Vec::new();
    for (table, site, metadata) in reachable_tables(sites)? {
        let created_at = sites
            .try_store_for(site)
            .and_then(|store| store.read_local_catalog().ok())
            .and_then(|infos| infos.into_iter().find(|info| info.name == table))
            .map_or(0, |info| info.created_at);
        tables.push((created_at, site, metadata));
    }
    // Stable, so tables created in the same second keep catalog order.
    tables.sort_by_key(|(created_at, _, _)| *created_at);

    let mut output = String::new();
    for (_, site, metadata) in tables {
        output.push_str(&format!(
            "-- Create table query for '{}' table\n{};\n\n",
            metadata.name,
            create_statement(&metadata, site)
        ));
    }
    Ok(output)
}

/// Renders one line per foreign key, then one line per table that takes
/// part in no relation.
pub fn erd(sites: &SiteResolver) -> DatabaseResult<String> {
    let tables: Vec<TableMetadata> = reachable_tables(sites)?
        .into_iter()
        .map(|(_, _, metadata)| metadata)
        .collect();

    let mut output = String::new();
    for child in &tables {
        for (_, column, fk) in child.foreign_keys() {
            output.push_str(&format!(
                "{} ({}) --(*)-------- REFERENCES --------(1)--> {} ({})\n",
                child.name, column.name, fk.table, fk.column
            ));
        }
    }

    for table in &tables {
        let holds_fk = table.foreign_keys().next().is_some();
        let is_referenced = tables
            .iter()
            .any(|other| other.name != table.name && other.references_table(&table.name));
        if !holds_fk && !is_referenced {
            output.push_str(&format!("{} is not associated with any table\n", table.name));
        }
    }
    Ok(output)
}

fn reachable_tables(sites: &SiteResolver) -> DatabaseResult<Vec<(String, Site, TableMetadata)>> {
    let catalog = sites.catalog()?;
    let mut tables = Vec::with_capacity(catalog.len());

    for (table, site) in catalog.iter() {
        let Some(store) = sites.try_store_for(site) else {
            warn!("Skipping table '{}': {} site is not reachable", table, site);
            continue;
        };
        match store.read_metadata(table) {
            Ok(metadata) => tables.push((table.to_string(), site, metadata)),
            Err(e) => warn!("Skipping table '{}': {}", table, e),
        }
    }
    Ok(tables)
}

fn create_statement(metadata: &TableMetadata, site: Site) -> Statement {
    let columns = metadata
        .columns
        .iter()
        .map(|column| ColumnDef {
            name: column.name.clone(),
            data_type: column.data_type,
            constraint: match (&column.constraint, column.foreign_key()) {
                (ConstraintKind::PrimaryKey, _) => ColumnConstraint::PrimaryKey,
                (ConstraintKind::ForeignKey, Some(fk)) => ColumnConstraint::ForeignKey {
                    table: fk.table.clone(),
                    column: fk.column.clone(),
                },
                _ => ColumnConstraint::None,
            },
        })
        .collect();

    Statement::CreateTable(CreateTableStatement {
        name: metadata.name.clone(),
        site: Some(site),
        columns,
    })
}
