//! Database error types.

use thiserror::Error;
use twin_common::{ErrorClass, ErrorCode};
use twin_sql::{ParseError, ValidationError};
use twin_storage::StorageError;

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Statement does not match its grammar.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Statement does not fit the schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage failure other than an unreachable site.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Primary key uniqueness would be violated.
    #[error("primary key violation: {0}")]
    PrimaryKeyViolation(String),

    /// Referential integrity would be violated.
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// The site holding the table cannot be reached.
    #[error("site unreachable: {0}")]
    SiteUnreachable(String),

    /// Catalog lists a table whose metadata is missing.
    #[error("catalog inconsistency: {0}")]
    CatalogInconsistency(String),

    /// Malformed session command.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Operation not allowed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Configuration rejected at open.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DatabaseError {
    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse(e) => e.code(),
            Self::Validation(e) => e.code(),
            Self::Storage(e) => e.code(),
            Self::PrimaryKeyViolation(_) => ErrorCode::PrimaryKeyViolation,
            Self::ForeignKeyViolation(_) => ErrorCode::ForeignKeyViolation,
            Self::SiteUnreachable(_) => ErrorCode::SiteUnreachable,
            Self::CatalogInconsistency(_) => ErrorCode::CatalogInconsistency,
            Self::InvalidCommand(_) | Self::Config(_) => ErrorCode::InvalidArgument,
            Self::InvalidState(_) => ErrorCode::Internal,
        }
    }

    /// Returns the user-facing class of the error.
    pub fn class(&self) -> ErrorClass {
        self.code().class()
    }
}

impl From<StorageError> for DatabaseError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Unreachable(msg) => Self::SiteUnreachable(msg),
            other => Self::Storage(other),
        }
    }
}

impl From<std::io::Error> for DatabaseError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(StorageError::Io(e))
    }
}

/// Database result type.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_storage_error_maps_to_site_unreachable() {
        let err: DatabaseError = StorageError::Unreachable("127.0.0.1:7878".into()).into();
        assert!(matches!(err, DatabaseError::SiteUnreachable(_)));
        assert_eq!(err.class(), ErrorClass::SiteUnreachable);
    }

    #[test]
    fn test_error_classes() {
        let err: DatabaseError = ParseError::Syntax("expected FROM".into()).into();
        assert_eq!(err.class(), ErrorClass::Syntax);

        let err: DatabaseError = ValidationError::TableNotFound("x".into()).into();
        assert_eq!(err.class(), ErrorClass::Semantic);

        let err = DatabaseError::PrimaryKeyViolation("duplicate".into());
        assert!(err.code().is_constraint_violation());
        assert_eq!(err.class(), ErrorClass::Semantic);

        let err = DatabaseError::CatalogInconsistency("t".into());
        assert_eq!(err.class(), ErrorClass::CatalogInconsistency);
    }
}
