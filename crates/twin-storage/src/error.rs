//! Storage error types.

use thiserror::Error;
use twin_common::ErrorCode;

use crate::remote::TransportError;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying file system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The table's metadata or data is not stored at this site.
    #[error("table '{0}' is not stored at this site")]
    TableNotFound(String),

    /// A column was not found in the stored header.
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A stored file does not follow the expected layout.
    #[error("malformed {file}: {reason}")]
    Corrupted {
        /// File (or logical record) that failed to decode.
        file: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The site cannot be reached.
    #[error("site unreachable: {0}")]
    Unreachable(String),

    /// The remote site reported a failure it could not classify.
    #[error("remote site error: {0}")]
    Remote(String),
}

impl StorageError {
    /// Creates a corruption error.
    pub fn corrupted(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the error means the site could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }

    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::Io,
            Self::TableNotFound(_) => ErrorCode::TableNotFound,
            Self::ColumnNotFound { .. } => ErrorCode::ColumnNotFound,
            Self::Corrupted { .. } => ErrorCode::Corruption,
            Self::Unreachable(_) => ErrorCode::SiteUnreachable,
            Self::Remote(_) => ErrorCode::TransportFailed,
        }
    }
}

impl From<TransportError> for StorageError {
    fn from(err: TransportError) -> Self {
        Self::Unreachable(err.to_string())
    }
}
