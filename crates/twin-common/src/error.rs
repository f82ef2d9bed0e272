//! Error codes shared by every TwinDB crate.
//!
//! Each crate defines its own `thiserror` enum; all of them map into
//! [`ErrorCode`] so that callers (the shell, the audit trail) can handle
//! failures by category without matching on crate-specific types.

use std::fmt;

/// Stable error codes, grouped by category in the high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Internal error (bug).
    Internal = 0x0001,
    /// Invalid argument or session command.
    InvalidArgument = 0x0002,

    // I/O errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,
    /// A stored file does not follow the expected layout.
    Corruption = 0x0101,

    // Statement errors (0x0200 - 0x02FF)
    /// Statement does not match the grammar of its kind.
    SyntaxError = 0x0200,
    /// Leading keyword is not a supported statement.
    UnknownStatement = 0x0201,
    /// Table not found in the distributed catalog.
    TableNotFound = 0x0202,
    /// Table already exists.
    TableExists = 0x0203,
    /// Column not found.
    ColumnNotFound = 0x0204,
    /// Literal cannot be coerced to the column type.
    TypeMismatch = 0x0205,
    /// Column list and value list lengths differ.
    ArityMismatch = 0x0206,
    /// Table definition is invalid (duplicate column, second primary key).
    InvalidDefinition = 0x0207,

    // Constraint errors (0x0300 - 0x03FF)
    /// Primary key uniqueness violated.
    PrimaryKeyViolation = 0x0300,
    /// Referential integrity violated.
    ForeignKeyViolation = 0x0301,

    // Site errors (0x0400 - 0x04FF)
    /// The site holding the table cannot be reached from this process.
    SiteUnreachable = 0x0400,
    /// The remote transport failed mid-request.
    TransportFailed = 0x0401,

    // Catalog errors (0x0500 - 0x05FF)
    /// Catalog lists a table whose metadata is missing.
    CatalogInconsistency = 0x0500,
}

/// Coarse classes of failure, as reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Grammar mismatch.
    Syntax,
    /// Unknown table/column, coercion failure, constraint violation.
    Semantic,
    /// Remote endpoint not reachable.
    SiteUnreachable,
    /// Catalog and metadata disagree.
    CatalogInconsistency,
    /// I/O and internal failures.
    System,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "I/O",
            0x02 => "Statement",
            0x03 => "Constraint",
            0x04 => "Site",
            0x05 => "Catalog",
            _ => "Unknown",
        }
    }

    /// Returns the user-facing class of this code.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::SyntaxError | Self::UnknownStatement => ErrorClass::Syntax,
            Self::TableNotFound
            | Self::TableExists
            | Self::ColumnNotFound
            | Self::TypeMismatch
            | Self::ArityMismatch
            | Self::InvalidDefinition
            | Self::InvalidArgument
            | Self::PrimaryKeyViolation
            | Self::ForeignKeyViolation => ErrorClass::Semantic,
            Self::SiteUnreachable | Self::TransportFailed => ErrorClass::SiteUnreachable,
            Self::CatalogInconsistency => ErrorClass::CatalogInconsistency,
            Self::Unknown | Self::Internal | Self::Io | Self::Corruption => ErrorClass::System,
        }
    }

    /// Returns true if the error is a constraint violation.
    #[must_use]
    pub const fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::PrimaryKeyViolation | Self::ForeignKeyViolation)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Syntax => "syntax error",
            Self::Semantic => "semantic error",
            Self::SiteUnreachable => "site unreachable",
            Self::CatalogInconsistency => "catalog inconsistency",
            Self::System => "system error",
        };
        f.write_str(name)
    }
}
