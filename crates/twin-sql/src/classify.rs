//! Statement classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a statement, decided by its leading keyword alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// `CREATE TABLE`
    Create,
    /// `INSERT INTO`
    Insert,
    /// `UPDATE`
    Update,
    /// `SELECT`
    Select,
    /// `DELETE FROM`
    Delete,
    /// `DROP TABLE`
    Drop,
    /// `TRUNCATE TABLE`
    Truncate,
    /// Anything else.
    Unknown,
}

impl StatementKind {
    /// Classifies raw statement text.
    ///
    /// The leading keyword must be followed by whitespace; a lone word is
    /// never a statement.
    pub fn classify(text: &str) -> Self {
        let text = text.trim_start();
        let Some((keyword, _)) = text.split_once(char::is_whitespace) else {
            return Self::Unknown;
        };

        match keyword.to_ascii_uppercase().as_str() {
            "CREATE" => Self::Create,
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "SELECT" => Self::Select,
            "DELETE" => Self::Delete,
            "DROP" => Self::Drop,
            "TRUNCATE" => Self::Truncate,
            _ => Self::Unknown,
        }
    }

    /// Returns true for statements that change storage.
    pub fn is_mutating(self) -> bool {
        !matches!(self, Self::Select | Self::Unknown)
    }

    /// Returns the leading keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Select => "SELECT",
            Self::Delete => "DELETE",
            Self::Drop => "DROP",
            Self::Truncate => "TRUNCATE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_keywords() {
        assert_eq!(StatementKind::classify("select * from t"), StatementKind::Select);
        assert_eq!(StatementKind::classify("  Insert into t values (1)"), StatementKind::Insert);
        assert_eq!(StatementKind::classify("TRUNCATE TABLE t"), StatementKind::Truncate);
        assert_eq!(StatementKind::classify("CREATE\tTABLE t (a INT)"), StatementKind::Create);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(StatementKind::classify("SELECT"), StatementKind::Unknown);
        assert_eq!(StatementKind::classify("GRANT ALL ON t"), StatementKind::Unknown);
        assert_eq!(StatementKind::classify(""), StatementKind::Unknown);
    }

    #[test]
    fn test_mutating_kinds() {
        assert!(StatementKind::Insert.is_mutating());
        assert!(StatementKind::Truncate.is_mutating());
        assert!(!StatementKind::Select.is_mutating());
        assert!(!StatementKind::Unknown.is_mutating());
    }
}
