//! Request/response messages between a LOCAL process and a site server.

use serde::{Deserialize, Serialize};
use twin_common::{DistributedCatalog, Row, Site, TableInfo, TableMetadata};

use crate::error::StorageError;
use crate::site::SiteStorage;

/// One facade operation, sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteRequest {
    /// Liveness check.
    Ping,
    /// `read_metadata`.
    ReadMetadata { table: String },
    /// `write_metadata`.
    WriteMetadata { metadata: TableMetadata },
    /// `create_data`.
    CreateData { table: String, header: Row },
    /// `read_data`.
    ReadData { table: String },
    /// `write_data`.
    WriteData { table: String, row: Row },
    /// `delete_all_rows`.
    DeleteAllRows { table: String },
    /// `delete_table_files`.
    DeleteTableFiles { table: String },
    /// `read_column_values`.
    ReadColumnValues { table: String, column: String },
    /// `increment_row_count`.
    IncrementRowCount { table: String },
    /// `decrement_row_count`.
    DecrementRowCount { table: String, n: u64 },
    /// `read_local_catalog`.
    ReadLocalCatalog,
    /// `write_local_catalog_entry`.
    WriteLocalCatalogEntry { info: TableInfo },
    /// `remove_local_catalog_entry`.
    RemoveLocalCatalogEntry { table: String },
    /// `read_distributed_catalog`.
    ReadDistributedCatalog,
    /// `write_distributed_catalog`.
    WriteDistributedCatalog { catalog: DistributedCatalog },
    /// `write_catalog_entry`.
    WriteCatalogEntry { table: String, site: Site },
}

impl SiteRequest {
    /// Returns the operation name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::ReadMetadata { .. } => "read_metadata",
            Self::WriteMetadata { .. } => "write_metadata",
            Self::CreateData { .. } => "create_data",
            Self::ReadData { .. } => "read_data",
            Self::WriteData { .. } => "write_data",
            Self::DeleteAllRows { .. } => "delete_all_rows",
            Self::DeleteTableFiles { .. } => "delete_table_files",
            Self::ReadColumnValues { .. } => "read_column_values",
            Self::IncrementRowCount { .. } => "increment_row_count",
            Self::DecrementRowCount { .. } => "decrement_row_count",
            Self::ReadLocalCatalog => "read_local_catalog",
            Self::WriteLocalCatalogEntry { .. } => "write_local_catalog_entry",
            Self::RemoveLocalCatalogEntry { .. } => "remove_local_catalog_entry",
            Self::ReadDistributedCatalog => "read_distributed_catalog",
            Self::WriteDistributedCatalog { .. } => "write_distributed_catalog",
            Self::WriteCatalogEntry { .. } => "write_catalog_entry",
        }
    }
}

/// Answer to a [`SiteRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteResponse {
    /// The operation succeeded and returns nothing.
    Done,
    /// Answer to `Ping`.
    Pong,
    /// Table metadata.
    Metadata(TableMetadata),
    /// Rows, header first.
    Rows(Vec<Row>),
    /// One column's values.
    Values(Vec<String>),
    /// Local catalog entries.
    LocalCatalog(Vec<TableInfo>),
    /// The distributed catalog.
    DistributedCatalog(DistributedCatalog),
    /// The operation failed at the server.
    Failed(RemoteFailure),
}

/// A storage failure as carried over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteFailure {
    /// Table not stored at the server's site.
    TableNotFound(String),
    /// Column missing from a stored header.
    ColumnNotFound { table: String, column: String },
    /// A stored file is malformed.
    Corrupted { file: String, reason: String },
    /// Anything else, as text.
    Other(String),
}

impl From<StorageError> for RemoteFailure {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TableNotFound(table) => Self::TableNotFound(table),
            StorageError::ColumnNotFound { table, column } => Self::ColumnNotFound { table, column },
            StorageError::Corrupted { file, reason } => Self::Corrupted { file, reason },
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<RemoteFailure> for StorageError {
    fn from(failure: RemoteFailure) -> Self {
        match failure {
            RemoteFailure::TableNotFound(table) => Self::TableNotFound(table),
            RemoteFailure::ColumnNotFound { table, column } => Self::ColumnNotFound { table, column },
            RemoteFailure::Corrupted { file, reason } => Self::Corrupted { file, reason },
            RemoteFailure::Other(message) => Self::Remote(message),
        }
    }
}

/// Executes a request against a store.
pub fn dispatch(store: &dyn SiteStorage, request: SiteRequest) -> SiteResponse {
    let result = match request {
        SiteRequest::Ping => return SiteResponse::Pong,
        SiteRequest::ReadMetadata { table } => store.read_metadata(&table).map(SiteResponse::Metadata),
        SiteRequest::WriteMetadata { metadata } => {
            store.write_metadata(&metadata).map(|()| SiteResponse::Done)
        }
        SiteRequest::CreateData { table, header } => {
            store.create_data(&table, &header).map(|()| SiteResponse::Done)
        }
        SiteRequest::ReadData { table } => store.read_data(&table).map(SiteResponse::Rows),
        SiteRequest::WriteData { table, row } => {
            store.write_data(&table, &row).map(|()| SiteResponse::Done)
        }
        SiteRequest::DeleteAllRows { table } => {
            store.delete_all_rows(&table).map(|()| SiteResponse::Done)
        }
        SiteRequest::DeleteTableFiles { table } => {
            store.delete_table_files(&table).map(|()| SiteResponse::Done)
        }
        SiteRequest::ReadColumnValues { table, column } => store
            .read_column_values(&table, &column)
            .map(SiteResponse::Values),
        SiteRequest::IncrementRowCount { table } => {
            store.increment_row_count(&table).map(|()| SiteResponse::Done)
        }
        SiteRequest::DecrementRowCount { table, n } => {
            store.decrement_row_count(&table, n).map(|()| SiteResponse::Done)
        }
        SiteRequest::ReadLocalCatalog => store.read_local_catalog().map(SiteResponse::LocalCatalog),
        SiteRequest::WriteLocalCatalogEntry { info } => store
            .write_local_catalog_entry(&info)
            .map(|()| SiteResponse::Done),
        SiteRequest::RemoveLocalCatalogEntry { table } => store
            .remove_local_catalog_entry(&table)
            .map(|()| SiteResponse::Done),
        SiteRequest::ReadDistributedCatalog => store
            .read_distributed_catalog()
            .map(SiteResponse::DistributedCatalog),
        SiteRequest::WriteDistributedCatalog { catalog } => store
            .write_distributed_catalog(&catalog)
            .map(|()| SiteResponse::Done),
        SiteRequest::WriteCatalogEntry { table, site } => store
            .write_catalog_entry(&table, site)
            .map(|()| SiteResponse::Done),
    };

    result.unwrap_or_else(|e| SiteResponse::Failed(e.into()))
}
