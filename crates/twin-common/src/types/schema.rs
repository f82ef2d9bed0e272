//! Table schema types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A stored row: text-encoded field values in column order.
pub type Row = Vec<String>;

/// Declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 32-bit signed integer.
    Int,
    /// 64-bit float.
    Double,
    /// Single-quoted text.
    Text,
}

impl DataType {
    /// Returns the keyword used in statements and metadata files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Double => "DOUBLE",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INT" => Ok(Self::Int),
            "DOUBLE" => Ok(Self::Double),
            "TEXT" => Ok(Self::Text),
            other => Err(format!("unsupported column type '{other}'")),
        }
    }
}

/// Column constraint kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// No constraint.
    #[default]
    None,
    /// Primary key.
    PrimaryKey,
    /// Foreign key referencing another table's column.
    ForeignKey,
}

impl ConstraintKind {
    /// Returns the name stored in metadata files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::PrimaryKey => "PRIMARY_KEY",
            Self::ForeignKey => "FOREIGN_KEY",
        }
    }
}

impl FromStr for ConstraintKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            // older data directories wrote UNKNOWN for unconstrained columns
            "NONE" | "UNKNOWN" => Ok(Self::None),
            "PRIMARY_KEY" => Ok(Self::PrimaryKey),
            "FOREIGN_KEY" => Ok(Self::ForeignKey),
            other => Err(format!("unsupported constraint '{other}'")),
        }
    }
}

/// Target of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its table.
    pub name: String,
    /// Declared type.
    pub data_type: DataType,
    /// Constraint kind.
    pub constraint: ConstraintKind,
    /// Foreign key target, present iff `constraint` is `ForeignKey`.
    pub references: Option<ForeignKeyRef>,
    /// Zero-based position in the table.
    pub ordinal: usize,
}

impl Column {
    /// Creates an unconstrained column. The ordinal is assigned by
    /// [`TableMetadata::new`].
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            constraint: ConstraintKind::None,
            references: None,
            ordinal: 0,
        }
    }

    /// Marks the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.constraint = ConstraintKind::PrimaryKey;
        self.references = None;
        self
    }

    /// Marks the column as a foreign key to `table(column)`.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.constraint = ConstraintKind::ForeignKey;
        self.references = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    /// Returns true if this column is the primary key.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.constraint == ConstraintKind::PrimaryKey
    }

    /// Returns the foreign key target if this column has one.
    #[must_use]
    pub fn foreign_key(&self) -> Option<&ForeignKeyRef> {
        match self.constraint {
            ConstraintKind::ForeignKey => self.references.as_ref(),
            _ => None,
        }
    }
}

/// Ordered column definitions of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Table name.
    pub name: String,
    /// Columns in declared order.
    pub columns: Vec<Column>,
}

impl TableMetadata {
    /// Creates table metadata, numbering the columns in order.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(ordinal, column)| Column { ordinal, ..column })
            .collect();
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the position of a column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the first primary key column and its position.
    ///
    /// Composite keys are not supported; any later primary key column is
    /// ignored.
    #[must_use]
    pub fn primary_key(&self) -> Option<(usize, &Column)> {
        self.columns.iter().enumerate().find(|(_, c)| c.is_primary_key())
    }

    /// Iterates over foreign key columns as `(position, column, target)`.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (usize, &Column, &ForeignKeyRef)> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| c.foreign_key().map(|fk| (idx, c, fk)))
    }

    /// Returns true if any column references `table`.
    #[must_use]
    pub fn references_table(&self, table: &str) -> bool {
        self.foreign_keys().any(|(_, _, fk)| fk.table == table)
    }

    /// Returns the column names in order; this is the data file header.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee() -> TableMetadata {
        TableMetadata::new(
            "employee",
            vec![
                Column::new("id", DataType::Int).primary_key(),
                Column::new("name", DataType::Text),
                Column::new("dept_id", DataType::Int).references("department", "id"),
            ],
        )
    }

    #[test]
    fn test_ordinals_follow_declaration_order() {
        let table = employee();
        let ordinals: Vec<_> = table.columns.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert_eq!(table.column_names(), vec!["id", "name", "dept_id"]);
    }

    #[test]
    fn test_key_lookup() {
        let table = employee();
        assert_eq!(table.primary_key().map(|(idx, c)| (idx, c.name.as_str())), Some((0, "id")));

        let fks: Vec<_> = table.foreign_keys().map(|(idx, _, fk)| (idx, fk.table.clone())).collect();
        assert_eq!(fks, vec![(2, "department".to_string())]);
        assert!(table.references_table("department"));
        assert!(!table.references_table("employee"));
    }

    #[test]
    fn test_constraint_names() {
        assert_eq!("PRIMARY_KEY".parse::<ConstraintKind>().unwrap(), ConstraintKind::PrimaryKey);
        assert_eq!("UNKNOWN".parse::<ConstraintKind>().unwrap(), ConstraintKind::None);
        assert_eq!("double".parse::<DataType>().unwrap(), DataType::Double);
        assert!("VARCHAR".parse::<DataType>().is_err());
    }
}
