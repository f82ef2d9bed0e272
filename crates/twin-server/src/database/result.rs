//! Statement execution results.

use twin_common::{Row, Site, FIELD_DELIMITER};
use twin_sql::StatementKind;

/// Result of executing a statement or session command.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    /// CREATE TABLE.
    Created {
        /// Table name.
        table: String,
        /// Site that owns it.
        site: Site,
    },
    /// INSERT.
    Inserted {
        /// Table name.
        table: String,
    },
    /// UPDATE.
    Updated {
        /// Table name.
        table: String,
        /// Rows rewritten.
        rows: usize,
    },
    /// DELETE.
    Deleted {
        /// Table name.
        table: String,
        /// Rows removed.
        rows: usize,
    },
    /// DROP TABLE.
    Dropped {
        /// Table name.
        table: String,
    },
    /// TRUNCATE TABLE.
    Truncated {
        /// Table name.
        table: String,
        /// Rows removed.
        rows: usize,
    },
    /// SELECT result.
    Query(QueryResult),
    /// Mutating statement appended to the pending log.
    Buffered {
        /// Kind of the buffered statement.
        kind: StatementKind,
    },
    /// `SET AUTO_COMMIT`.
    AutoCommit(bool),
    /// COMMIT.
    Committed {
        /// Statements replayed successfully.
        replayed: usize,
        /// Statements that failed during replay, with their errors.
        failures: Vec<String>,
    },
    /// ROLLBACK.
    RolledBack {
        /// Statements discarded.
        discarded: usize,
    },
}

impl StatementResult {
    /// Returns the number of rows affected, if applicable.
    pub fn rows_affected(&self) -> Option<usize> {
        match self {
            Self::Inserted { .. } => Some(1),
            Self::Updated { rows, .. } | Self::Deleted { rows, .. } | Self::Truncated { rows, .. } => {
                Some(*rows)
            }
            Self::Query(result) => Some(result.len()),
            _ => None,
        }
    }

    /// Returns the query result if this is a SELECT.
    pub fn as_query(&self) -> Option<&QueryResult> {
        match self {
            Self::Query(result) => Some(result),
            _ => None,
        }
    }

    /// Display as a string.
    pub fn display(&self) -> String {
        match self {
            Self::Created { table, site } => format!("Table '{table}' created at {site}"),
            Self::Inserted { table } => format!("1 row inserted into '{table}'"),
            Self::Updated { table, rows } => format!("{} updated in '{table}'", plural(*rows)),
            Self::Deleted { table, rows } => format!("{} deleted from '{table}'", plural(*rows)),
            Self::Dropped { table } => format!("Table '{table}' dropped"),
            Self::Truncated { table, rows } => {
                format!("Table '{table}' truncated, {} removed", plural(*rows))
            }
            Self::Query(result) => result.display(),
            Self::Buffered { kind } => {
                format!("{kind} statement added to the pending transaction")
            }
            Self::AutoCommit(true) => "Auto-commit enabled".to_string(),
            Self::AutoCommit(false) => "Auto-commit disabled".to_string(),
            Self::Committed { replayed, failures } => {
                let mut output = format!(
                    "Transaction committed: {replayed} applied, {} failed",
                    failures.len()
                );
                for failure in failures {
                    output.push_str("\n  ");
                    output.push_str(failure);
                }
                output
            }
            Self::RolledBack { discarded } => {
                format!("Transaction rolled back: {discarded} discarded")
            }
        }
    }
}

fn plural(rows: usize) -> String {
    if rows == 1 {
        "1 row".to_string()
    } else {
        format!("{rows} rows")
    }
}

/// Rows returned by a SELECT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Projected column names.
    pub columns: Vec<String>,
    /// Projected rows.
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Creates a result.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no row matched.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the values of one projected column.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .filter_map(|row| row.get(idx).map(String::as_str))
                .collect(),
        )
    }

    /// Renders the header, one pipe-delimited line per row and the row
    /// count.
    pub fn display(&self) -> String {
        let delimiter = FIELD_DELIMITER.to_string();
        let mut output = self.columns.join(&delimiter);
        output.push('\n');
        for row in &self.rows {
            output.push_str(&row.join(&delimiter));
            output.push('\n');
        }
        output.push_str(&format!("\n{} rows returned", self.rows.len()));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_statement_result_display() {
        let result = StatementResult::Updated {
            table: "employee".into(),
            rows: 2,
        };
        assert_eq!(result.display(), "2 rows updated in 'employee'");
        assert_eq!(result.rows_affected(), Some(2));

        let result = StatementResult::Deleted {
            table: "employee".into(),
            rows: 1,
        };
        assert_eq!(result.display(), "1 row deleted from 'employee'");

        assert_eq!(StatementResult::AutoCommit(false).rows_affected(), None);
    }

    #[test]
    fn test_commit_display_lists_failures() {
        let result = StatementResult::Committed {
            replayed: 2,
            failures: vec!["INSERT INTO t VALUES (1): duplicate".into()],
        };
        assert_eq!(
            result.display(),
            "Transaction committed: 2 applied, 1 failed\n  INSERT INTO t VALUES (1): duplicate"
        );
    }

    #[test]
    fn test_query_result_empty() {
        let result = QueryResult::new(vec!["id".into(), "name".into()], Vec::new());
        assert!(result.is_empty());
        assert_eq!(result.display(), "id|name\n\n0 rows returned");
    }

    #[test]
    fn test_query_result_display() {
        let result = QueryResult::new(
            vec!["id".into(), "name".into()],
            vec![row(&["1", "Sales"]), row(&["2", "R&D"])],
        );

        assert_eq!(result.display(), "id|name\n1|Sales\n2|R&D\n\n2 rows returned");
        assert_eq!(result.column("name"), Some(vec!["Sales", "R&D"]));
        assert_eq!(result.column("budget"), None);
    }
}
