//! Statement types produced by the parser.

use std::fmt;

use serde::{Deserialize, Serialize};
use twin_common::{DataType, Site};

use crate::classify::StatementKind;

/// A parsed statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// CREATE TABLE statement.
    CreateTable(CreateTableStatement),
    /// INSERT statement.
    Insert(InsertStatement),
    /// UPDATE statement.
    Update(UpdateStatement),
    /// DELETE statement.
    Delete(DeleteStatement),
    /// SELECT query.
    Select(SelectStatement),
    /// DROP TABLE statement.
    DropTable(String),
    /// TRUNCATE TABLE statement.
    TruncateTable(String),
}

impl Statement {
    /// Returns the statement kind.
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::CreateTable(_) => StatementKind::Create,
            Self::Insert(_) => StatementKind::Insert,
            Self::Update(_) => StatementKind::Update,
            Self::Delete(_) => StatementKind::Delete,
            Self::Select(_) => StatementKind::Select,
            Self::DropTable(_) => StatementKind::Drop,
            Self::TruncateTable(_) => StatementKind::Truncate,
        }
    }

    /// Returns the target table.
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable(s) => &s.name,
            Self::Insert(s) => &s.table,
            Self::Update(s) => &s.table,
            Self::Delete(s) => &s.table,
            Self::Select(s) => &s.table,
            Self::DropTable(name) | Self::TruncateTable(name) => name,
        }
    }
}

/// CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableStatement {
    /// Table name.
    pub name: String,
    /// Site given by the `NODE` clause, if any.
    pub site: Option<Site>,
    /// Column definitions.
    pub columns: Vec<ColumnDef>,
}

/// A column in CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub data_type: DataType,
    /// Key constraint.
    pub constraint: ColumnConstraint,
}

/// Key constraint of a column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnConstraint {
    /// None.
    None,
    /// `PRIMARY KEY`
    PrimaryKey,
    /// `FOREIGN KEY REFERENCES table(column)`
    ForeignKey {
        /// Referenced table.
        table: String,
        /// Referenced column.
        column: String,
    },
}

/// INSERT statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    /// Target table.
    pub table: String,
    /// Explicit column list, if given.
    pub columns: Option<Vec<String>>,
    /// Values, in column-list order.
    pub values: Vec<Literal>,
}

/// UPDATE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    /// Target table.
    pub table: String,
    /// The single `SET col = val`.
    pub assignment: Assignment,
    /// Optional `WHERE col = val`.
    pub predicate: Option<Predicate>,
}

/// DELETE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    /// Target table.
    pub table: String,
    /// Optional `WHERE col = val`.
    pub predicate: Option<Predicate>,
}

/// SELECT query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    /// Target table.
    pub table: String,
    /// Requested columns.
    pub projection: Projection,
    /// Optional `WHERE col = val`.
    pub predicate: Option<Predicate>,
}

/// SELECT column list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    /// `*`
    All,
    /// Named columns, in requested order.
    Columns(Vec<String>),
}

/// `col = val` in a SET clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Column name.
    pub column: String,
    /// New value.
    pub value: Literal,
}

/// `col = val` in a WHERE clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Column name.
    pub column: String,
    /// Value compared for equality.
    pub value: Literal,
}

/// An uncoerced literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    /// Numeric text as written.
    Number(String),
    /// Quoted text, quotes stripped.
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(n),
            Self::Text(t) => write!(f, "'{t}'"),
        }
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        match &self.constraint {
            ColumnConstraint::None => Ok(()),
            ColumnConstraint::PrimaryKey => f.write_str(" PRIMARY KEY"),
            ColumnConstraint::ForeignKey { table, column } => {
                write!(f, " FOREIGN KEY REFERENCES {table}({column})")
            }
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_predicate(f: &mut fmt::Formatter<'_>, predicate: Option<&Predicate>) -> fmt::Result {
    match predicate {
        Some(p) => write!(f, " WHERE {} = {}", p.column, p.value),
        None => Ok(()),
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable(s) => {
                write!(f, "CREATE TABLE {}", s.name)?;
                if let Some(site) = s.site {
                    write!(f, " NODE {site}")?;
                }
                f.write_str(" (")?;
                write_list(f, &s.columns)?;
                f.write_str(")")
            }
            Self::Insert(s) => {
                write!(f, "INSERT INTO {}", s.table)?;
                if let Some(columns) = &s.columns {
                    f.write_str(" (")?;
                    write_list(f, columns)?;
                    f.write_str(")")?;
                }
                f.write_str(" VALUES (")?;
                write_list(f, &s.values)?;
                f.write_str(")")
            }
            Self::Update(s) => {
                write!(
                    f,
                    "UPDATE {} SET {} = {}",
                    s.table, s.assignment.column, s.assignment.value
                )?;
                write_predicate(f, s.predicate.as_ref())
            }
            Self::Delete(s) => {
                write!(f, "DELETE FROM {}", s.table)?;
                write_predicate(f, s.predicate.as_ref())
            }
            Self::Select(s) => {
                f.write_str("SELECT ")?;
                match &s.projection {
                    Projection::All => f.write_str("*")?,
                    Projection::Columns(columns) => write_list(f, columns)?,
                }
                write!(f, " FROM {}", s.table)?;
                write_predicate(f, s.predicate.as_ref())
            }
            Self::DropTable(name) => write!(f, "DROP TABLE {name}"),
            Self::TruncateTable(name) => write!(f, "TRUNCATE TABLE {name}"),
        }
    }
}
