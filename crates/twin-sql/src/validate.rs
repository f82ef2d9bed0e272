//! Semantic validation.
//!
//! Runs after parsing and before anything is executed. The validator only
//! needs schema information; it never reads rows. Constraint checks that
//! depend on stored rows belong to the engine.

use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;
use twin_common::types::Column;
use twin_common::{DataType, ErrorCode, Row, Site, TableMetadata, NULL_FIELD};

use crate::parser::{
    ColumnConstraint, CreateTableStatement, DeleteStatement, InsertStatement, Literal, Predicate,
    Projection, SelectStatement, UpdateStatement,
};
use crate::value::Value;

/// Errors that can occur during semantic validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Table not in the distributed catalog.
    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    /// Table already in the distributed catalog.
    #[error("table '{0}' already exists")]
    TableExists(String),

    /// Column not in the table.
    #[error("column '{column}' does not exist in table '{table}'")]
    ColumnNotFound {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A column name appears twice.
    #[error("column '{0}' is listed more than once")]
    DuplicateColumn(String),

    /// More than one primary key declared.
    #[error("table '{0}' declares more than one primary key")]
    MultiplePrimaryKeys(String),

    /// A foreign key target does not exist.
    #[error("foreign key '{column}' references missing {target}")]
    MissingReference {
        /// The foreign key column.
        column: String,
        /// `table` or `table(column)`.
        target: String,
    },

    /// A literal does not fit its column type.
    #[error("{value} is not a valid {expected} value for column '{column}'")]
    TypeMismatch {
        /// Column name.
        column: String,
        /// Declared type.
        expected: DataType,
        /// The literal as written.
        value: String,
    },

    /// Column and value counts differ.
    #[error("{columns} columns but {values} values supplied")]
    ArityMismatch {
        /// Number of target columns.
        columns: usize,
        /// Number of values.
        values: usize,
    },

    /// An explicit column list leaves out the primary key.
    #[error("primary key column '{0}' must be supplied")]
    MissingPrimaryKey(String),
}

impl ValidationError {
    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::TableNotFound(_) | Self::MissingReference { .. } => ErrorCode::TableNotFound,
            Self::TableExists(_) => ErrorCode::TableExists,
            Self::ColumnNotFound { .. } => ErrorCode::ColumnNotFound,
            Self::DuplicateColumn(_) | Self::MultiplePrimaryKeys(_) => {
                ErrorCode::InvalidDefinition
            }
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::ArityMismatch { .. } | Self::MissingPrimaryKey(_) => ErrorCode::ArityMismatch,
        }
    }
}

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Schema lookups needed to validate CREATE TABLE.
pub trait SchemaProvider {
    /// Returns true if the table is in the distributed catalog.
    fn table_exists(&self, table: &str) -> bool;

    /// Returns a table's metadata, or `None` when it cannot be read from
    /// this site. Checks that need it are then skipped.
    fn table_metadata(&self, table: &str) -> Option<TableMetadata>;
}

/// A validated CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCreate {
    /// Metadata to store.
    pub metadata: TableMetadata,
    /// Site that will own the table.
    pub site: Site,
}

/// A validated INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundInsert {
    /// Full row in column order; omitted columns hold `null`.
    pub row: Row,
}

/// A validated `WHERE col = val`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundPredicate {
    /// Column position.
    pub column: usize,
    /// Encoded value.
    pub value: String,
}

impl BoundPredicate {
    /// Returns true if the row's field equals the predicate value.
    pub fn matches(&self, row: &[String]) -> bool {
        row.get(self.column).is_some_and(|field| *field == self.value)
    }
}

/// A validated UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundUpdate {
    /// Position of the assigned column.
    pub column: usize,
    /// Encoded new value.
    pub value: String,
    /// Row filter; `None` selects every row.
    pub predicate: Option<BoundPredicate>,
}

/// A validated DELETE.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundDelete {
    /// Row filter; `None` selects every row.
    pub predicate: Option<BoundPredicate>,
}

/// A validated SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSelect {
    /// Positions of the projected columns, in output order.
    pub columns: Vec<usize>,
    /// Row filter; `None` selects every row.
    pub predicate: Option<BoundPredicate>,
}

/// Semantic validator.
pub struct Validator;

impl Validator {
    /// Validates CREATE TABLE. Tables without a `NODE` clause belong to
    /// `current_site`.
    pub fn validate_create(
        stmt: &CreateTableStatement,
        current_site: Site,
        schema: &dyn SchemaProvider,
    ) -> ValidationResult<BoundCreate> {
        if schema.table_exists(&stmt.name) {
            return Err(ValidationError::TableExists(stmt.name.clone()));
        }

        let mut seen = HashSet::new();
        let mut has_primary_key = false;
        let mut columns = Vec::with_capacity(stmt.columns.len());

        for def in &stmt.columns {
            if !seen.insert(def.name.as_str()) {
                return Err(ValidationError::DuplicateColumn(def.name.clone()));
            }

            let column = Column::new(def.name.clone(), def.data_type);
            let column = match &def.constraint {
                ColumnConstraint::None => column,
                ColumnConstraint::PrimaryKey => {
                    if has_primary_key {
                        return Err(ValidationError::MultiplePrimaryKeys(stmt.name.clone()));
                    }
                    has_primary_key = true;
                    column.primary_key()
                }
                ColumnConstraint::ForeignKey { table, column: target } => {
                    Self::check_reference(&def.name, table, target, schema)?;
                    column.references(table.clone(), target.clone())
                }
            };
            columns.push(column);
        }

        Ok(BoundCreate {
            metadata: TableMetadata::new(stmt.name.clone(), columns),
            site: stmt.site.unwrap_or(current_site),
        })
    }

    fn check_reference(
        column: &str,
        table: &str,
        target: &str,
        schema: &dyn SchemaProvider,
    ) -> ValidationResult<()> {
        if !schema.table_exists(table) {
            return Err(ValidationError::MissingReference {
                column: column.to_string(),
                target: table.to_string(),
            });
        }
        match schema.table_metadata(table) {
            Some(metadata) if metadata.column(target).is_none() => {
                Err(ValidationError::MissingReference {
                    column: column.to_string(),
                    target: format!("{table}({target})"),
                })
            }
            Some(_) => Ok(()),
            None => {
                warn!(
                    "Cannot read {} from this site; skipping check of {}({})",
                    table, table, target
                );
                Ok(())
            }
        }
    }

    /// Validates INSERT against the target table.
    pub fn validate_insert(
        stmt: &InsertStatement,
        metadata: &TableMetadata,
    ) -> ValidationResult<BoundInsert> {
        let targets: Vec<usize> = match &stmt.columns {
            None => (0..metadata.arity()).collect(),
            Some(names) => {
                let mut seen = HashSet::new();
                let mut targets = Vec::with_capacity(names.len());
                for name in names {
                    if !seen.insert(name.as_str()) {
                        return Err(ValidationError::DuplicateColumn(name.clone()));
                    }
                    targets.push(Self::column_index(metadata, name)?);
                }
                if let Some((pk, column)) = metadata.primary_key() {
                    if !targets.contains(&pk) {
                        return Err(ValidationError::MissingPrimaryKey(column.name.clone()));
                    }
                }
                targets
            }
        };

        if targets.len() != stmt.values.len() {
            return Err(ValidationError::ArityMismatch {
                columns: targets.len(),
                values: stmt.values.len(),
            });
        }

        let mut row = vec![NULL_FIELD.to_string(); metadata.arity()];
        for (&idx, literal) in targets.iter().zip(&stmt.values) {
            row[idx] = Self::coerce(&metadata.columns[idx], literal)?;
        }

        Ok(BoundInsert { row })
    }

    /// Validates UPDATE against the target table.
    pub fn validate_update(
        stmt: &UpdateStatement,
        metadata: &TableMetadata,
    ) -> ValidationResult<BoundUpdate> {
        let column = Self::column_index(metadata, &stmt.assignment.column)?;
        let value = Self::coerce(&metadata.columns[column], &stmt.assignment.value)?;
        let predicate = Self::bind_predicate(stmt.predicate.as_ref(), metadata)?;

        Ok(BoundUpdate {
            column,
            value,
            predicate,
        })
    }

    /// Validates DELETE against the target table.
    pub fn validate_delete(
        stmt: &DeleteStatement,
        metadata: &TableMetadata,
    ) -> ValidationResult<BoundDelete> {
        Ok(BoundDelete {
            predicate: Self::bind_predicate(stmt.predicate.as_ref(), metadata)?,
        })
    }

    /// Validates SELECT against the target table.
    pub fn validate_select(
        stmt: &SelectStatement,
        metadata: &TableMetadata,
    ) -> ValidationResult<BoundSelect> {
        let columns = match &stmt.projection {
            Projection::All => (0..metadata.arity()).collect(),
            Projection::Columns(names) => names
                .iter()
                .map(|name| Self::column_index(metadata, name))
                .collect::<ValidationResult<Vec<_>>>()?,
        };

        Ok(BoundSelect {
            columns,
            predicate: Self::bind_predicate(stmt.predicate.as_ref(), metadata)?,
        })
    }

    fn bind_predicate(
        predicate: Option<&Predicate>,
        metadata: &TableMetadata,
    ) -> ValidationResult<Option<BoundPredicate>> {
        let Some(predicate) = predicate else {
            return Ok(None);
        };
        let column = Self::column_index(metadata, &predicate.column)?;
        let value = Self::coerce(&metadata.columns[column], &predicate.value)?;
        Ok(Some(BoundPredicate { column, value }))
    }

    fn column_index(metadata: &TableMetadata, name: &str) -> ValidationResult<usize> {
        metadata
            .column_index(name)
            .ok_or_else(|| ValidationError::ColumnNotFound {
                table: metadata.name.clone(),
                column: name.to_string(),
            })
    }

    fn coerce(column: &Column, literal: &Literal) -> ValidationResult<String> {
        Value::coerce(literal, column.data_type)
            .map(|value| value.encode())
            .ok_or_else(|| ValidationError::TypeMismatch {
                column: column.name.clone(),
                expected: column.data_type,
                value: literal.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, Statement};
    use std::collections::HashMap;

    struct Catalog(HashMap<String, Option<TableMetadata>>);

    impl SchemaProvider for Catalog {
        fn table_exists(&self, table: &str) -> bool {
            self.0.contains_key(table)
        }

        fn table_metadata(&self, table: &str) -> Option<TableMetadata> {
            self.0.get(table).cloned().flatten()
        }
    }

    fn department() -> TableMetadata {
        TableMetadata::new(
            "department",
            vec![
                Column::new("id", DataType::Int).primary_key(),
                Column::new("name", DataType::Text),
                Column::new("budget", DataType::Double),
            ],
        )
    }

    fn catalog() -> Catalog {
        let mut tables = HashMap::new();
        tables.insert("department".to_string(), Some(department()));
        tables.insert("faraway".to_string(), None);
        Catalog(tables)
    }

    fn create(text: &str) -> ValidationResult<BoundCreate> {
        let Statement::CreateTable(stmt) = Parser::parse(text).unwrap() else {
            panic!("expected CreateTable");
        };
        Validator::validate_create(&stmt, Site::Local, &catalog())
    }

    fn insert(text: &str) -> ValidationResult<BoundInsert> {
        let Statement::Insert(stmt) = Parser::parse(text).unwrap() else {
            panic!("expected Insert");
        };
        Validator::validate_insert(&stmt, &department())
    }

    #[test]
    fn test_create_builds_metadata() {
        let bound = create(
            "CREATE TABLE employee NODE REMOTE (id INT PRIMARY KEY, \
             dept_id INT FOREIGN KEY REFERENCES department(id))",
        )
        .unwrap();
        assert_eq!(bound.site, Site::Remote);
        assert_eq!(bound.metadata.primary_key().map(|(i, _)| i), Some(0));
        assert!(bound.metadata.references_table("department"));

        let bound = create("CREATE TABLE audit (note TEXT)").unwrap();
        assert_eq!(bound.site, Site::Local);
    }

    #[test]
    fn test_create_rejections() {
        assert_eq!(
            create("CREATE TABLE department (id INT)").unwrap_err(),
            ValidationError::TableExists("department".to_string())
        );
        assert_eq!(
            create("CREATE TABLE t (a INT, a TEXT)").unwrap_err(),
            ValidationError::DuplicateColumn("a".to_string())
        );
        assert_eq!(
            create("CREATE TABLE t (a INT PRIMARY KEY, b INT PRIMARY KEY)").unwrap_err(),
            ValidationError::MultiplePrimaryKeys("t".to_string())
        );
        assert!(matches!(
            create("CREATE TABLE t (a INT FOREIGN KEY REFERENCES nowhere(id))"),
            Err(ValidationError::MissingReference { .. })
        ));
        assert!(matches!(
            create("CREATE TABLE t (a INT FOREIGN KEY REFERENCES department(code))"),
            Err(ValidationError::MissingReference { target, .. }) if target == "department(code)"
        ));
    }

    #[test]
    fn test_create_skips_unreadable_reference() {
        assert!(create("CREATE TABLE t (a INT FOREIGN KEY REFERENCES faraway(id))").is_ok());
    }

    #[test]
    fn test_insert_full_row() {
        let bound = insert("INSERT INTO department VALUES (1, 'eng', 2.50)").unwrap();
        assert_eq!(bound.row, vec!["1", "eng", "2.5"]);
    }

    #[test]
    fn test_insert_column_list_fills_null() {
        let bound = insert("INSERT INTO department (name, id) VALUES ('ops', 2)").unwrap();
        assert_eq!(bound.row, vec!["2", "ops", "null"]);
    }

    #[test]
    fn test_insert_rejections() {
        assert_eq!(
            insert("INSERT INTO department VALUES (1, 'eng')").unwrap_err(),
            ValidationError::ArityMismatch { columns: 3, values: 2 }
        );
        assert_eq!(
            insert("INSERT INTO department (name) VALUES ('ops')").unwrap_err(),
            ValidationError::MissingPrimaryKey("id".to_string())
        );
        assert!(matches!(
            insert("INSERT INTO department VALUES ('one', 'eng', 1.0)"),
            Err(ValidationError::TypeMismatch { expected: DataType::Int, .. })
        ));
        for value in ["'line\nbreak'", "'   '"] {
            assert!(matches!(
                insert(&format!("INSERT INTO department VALUES (1, {value}, 1.0)")),
                Err(ValidationError::TypeMismatch { expected: DataType::Text, .. })
            ));
        }
        // unquoted text never reaches validation
        assert!(Parser::parse("INSERT INTO department VALUES (1, eng, 1.0)").is_err());
        assert!(matches!(
            insert("INSERT INTO department (id, nope) VALUES (1, 'x')"),
            Err(ValidationError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_update_and_select_binding() {
        let Statement::Update(stmt) =
            Parser::parse("UPDATE department SET budget = 3 WHERE name = 'eng'").unwrap()
        else {
            panic!("expected Update");
        };
        let bound = Validator::validate_update(&stmt, &department()).unwrap();
        assert_eq!(bound.column, 2);
        assert_eq!(bound.value, "3.0");
        let predicate = bound.predicate.unwrap();
        assert!(predicate.matches(&["1".into(), "eng".into(), "1.0".into()]));
        assert!(!predicate.matches(&["1".into(), "ENG".into(), "1.0".into()]));

        let Statement::Select(stmt) = Parser::parse("SELECT budget, id FROM department").unwrap()
        else {
            panic!("expected Select");
        };
        let bound = Validator::validate_select(&stmt, &department()).unwrap();
        assert_eq!(bound.columns, vec![2, 0]);
        assert!(bound.predicate.is_none());
    }

    #[test]
    fn test_where_type_mismatch() {
        let Statement::Delete(stmt) =
            Parser::parse("DELETE FROM department WHERE id = 'one'").unwrap()
        else {
            panic!("expected Delete");
        };
        assert!(matches!(
            Validator::validate_delete(&stmt, &department()),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }
}
