//! On-disk layout of the pipe-delimited files.
//!
//! Every file starts with a header record. Decoders skip the header and any
//! blank line; they never trust field counts blindly.

use twin_common::types::{Column, ConstraintKind, DataType, ForeignKeyRef};
use twin_common::{
    DistributedCatalog, Row, Site, TableInfo, TableMetadata, DISTRIBUTED_CATALOG_HEADER,
    FIELD_DELIMITER, LOCAL_CATALOG_HEADER, METADATA_HEADER, NULL_FIELD,
};

use crate::error::{StorageError, StorageResult};

/// Joins fields into one record.
pub fn encode_record<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(FIELD_DELIMITER);
        }
        line.push_str(field.as_ref());
    }
    line
}

/// Splits one record into fields.
pub fn decode_record(line: &str) -> Row {
    line.split(FIELD_DELIMITER).map(str::to_string).collect()
}

fn records(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
}

// =============================================================================
// Data files
// =============================================================================

/// Encodes rows (header first) as file content.
pub fn encode_rows(rows: &[Row]) -> String {
    let mut content = String::new();
    for row in rows {
        content.push_str(&encode_record(row));
        content.push('\n');
    }
    content
}

/// Decodes file content into rows, header first.
pub fn decode_rows(content: &str) -> Vec<Row> {
    records(content).map(decode_record).collect()
}

// =============================================================================
// Metadata files
// =============================================================================

/// Encodes table metadata as file content.
pub fn encode_metadata(metadata: &TableMetadata) -> String {
    let mut content = String::from(METADATA_HEADER);
    content.push('\n');
    for column in &metadata.columns {
        let (fk_table, fk_column) = match column.foreign_key() {
            Some(fk) => (fk.table.as_str(), fk.column.as_str()),
            None => (NULL_FIELD, NULL_FIELD),
        };
        content.push_str(&encode_record(&[
            column.name.as_str(),
            column.data_type.as_str(),
            column.constraint.as_str(),
            fk_table,
            fk_column,
        ]));
        content.push('\n');
    }
    content
}

/// Decodes a metadata file.
pub fn decode_metadata(table: &str, content: &str) -> StorageResult<TableMetadata> {
    let file = twin_common::metadata_file_name(table);
    let mut columns = Vec::new();

    for line in records(content).skip(1) {
        let fields = decode_record(line);
        if fields.len() != 5 {
            return Err(StorageError::corrupted(
                &file,
                format!("expected 5 fields, found {} in '{line}'", fields.len()),
            ));
        }
        let data_type: DataType = fields[1]
            .parse()
            .map_err(|e: String| StorageError::corrupted(&file, e))?;
        let constraint: ConstraintKind = fields[2]
            .parse()
            .map_err(|e: String| StorageError::corrupted(&file, e))?;

        let mut column = Column::new(fields[0].clone(), data_type);
        column.constraint = constraint;
        if constraint == ConstraintKind::ForeignKey {
            if fields[3] == NULL_FIELD || fields[4] == NULL_FIELD {
                return Err(StorageError::corrupted(
                    &file,
                    format!("foreign key column '{}' has no target", fields[0]),
                ));
            }
            column.references = Some(ForeignKeyRef {
                table: fields[3].clone(),
                column: fields[4].clone(),
            });
        }
        columns.push(column);
    }

    Ok(TableMetadata::new(table, columns))
}

// =============================================================================
// Catalog files
// =============================================================================

/// Encodes the local catalog as file content.
pub fn encode_local_catalog(entries: &[TableInfo]) -> String {
    let mut content = String::from(LOCAL_CATALOG_HEADER);
    content.push('\n');
    for info in entries {
        content.push_str(&encode_record(&[
            info.name.clone(),
            info.row_count.to_string(),
            info.created_at.to_string(),
        ]));
        content.push('\n');
    }
    content
}

/// Decodes the local catalog file.
pub fn decode_local_catalog(content: &str) -> StorageResult<Vec<TableInfo>> {
    let file = twin_common::LOCAL_CATALOG_FILE;
    records(content)
        .skip(1)
        .map(|line| {
            let fields = decode_record(line);
            if fields.len() != 3 {
                return Err(StorageError::corrupted(file, format!("bad entry '{line}'")));
            }
            let row_count = fields[1]
                .parse::<u64>()
                .map_err(|e| StorageError::corrupted(file, format!("bad row count: {e}")))?;
            let created_at = fields[2]
                .parse::<i64>()
                .map_err(|e| StorageError::corrupted(file, format!("bad timestamp: {e}")))?;
            Ok(TableInfo::new(fields[0].clone())
                .with_row_count(row_count)
                .with_created_at(created_at))
        })
        .collect()
}

/// Encodes the distributed catalog as file content.
pub fn encode_distributed_catalog(catalog: &DistributedCatalog) -> String {
    let mut content = String::from(DISTRIBUTED_CATALOG_HEADER);
    content.push('\n');
    for (table, site) in catalog.iter() {
        content.push_str(&encode_record(&[table, site.as_str()]));
        content.push('\n');
    }
    content
}

/// Decodes the distributed catalog file.
pub fn decode_distributed_catalog(content: &str) -> StorageResult<DistributedCatalog> {
    let file = twin_common::DISTRIBUTED_CATALOG_FILE;
    let mut catalog = DistributedCatalog::new();
    for line in records(content).skip(1) {
        let fields = decode_record(line);
        if fields.len() != 2 {
            return Err(StorageError::corrupted(file, format!("bad entry '{line}'")));
        }
        let site: Site = fields[1]
            .parse()
            .map_err(|e: twin_common::types::ParseSiteError| {
                StorageError::corrupted(file, e.to_string())
            })?;
        catalog.insert(fields[0].clone(), site);
    }
    Ok(catalog)
}
