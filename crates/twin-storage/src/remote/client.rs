//! Blocking client for a remote site.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};

use bytes::{BufMut, BytesMut};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use twin_common::{DistributedCatalog, Row, Site, TableInfo, TableMetadata};

use super::frame::{self, HEADER_SIZE};
use super::protocol::{SiteRequest, SiteResponse};
use super::{TransportError, TransportResult};
use crate::error::{StorageError, StorageResult};
use crate::site::SiteStorage;

/// Site storage living behind a [`SiteServer`](super::SiteServer).
///
/// The TCP connection is opened on the first request and kept until
/// [`close`](SiteStorage::close). Calls block without timeout or retry;
/// after a failed call the connection is dropped and the next call
/// reconnects.
#[derive(Debug)]
pub struct RemoteStore {
    addr: String,
    stream: Mutex<Option<TcpStream>>,
}

impl RemoteStore {
    /// Creates a client for the server at `addr`. Nothing is connected yet.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: Mutex::new(None),
        }
    }

    /// Returns the server address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Returns true if a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.stream.lock().is_some()
    }

    /// Checks that the server answers.
    pub fn ping(&self) -> StorageResult<()> {
        match self.call(SiteRequest::Ping)? {
            SiteResponse::Pong => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    fn connect(&self) -> TransportResult<TcpStream> {
        debug!("Connecting to remote site at {}", self.addr);
        let stream =
            TcpStream::connect(&self.addr).map_err(|e| TransportError::ConnectionFailed {
                addr: self.addr.clone(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;
        info!("Connected to remote site at {}", self.addr);
        Ok(stream)
    }

    fn round_trip(stream: &mut TcpStream, request: &SiteRequest) -> TransportResult<SiteResponse> {
        let encoded = frame::encode(request)?;
        stream.write_all(&encoded)?;
        stream.flush()?;

        let mut header = [0u8; HEADER_SIZE];
        read_exact(stream, &mut header)?;
        let len = frame::payload_len(&header)?;

        let mut payload = vec![0u8; len];
        read_exact(stream, &mut payload)?;

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + len);
        buf.put_slice(&header);
        buf.put_slice(&payload);
        frame::decode(buf.freeze())
    }

    /// Sends one request and waits for its response.
    fn call(&self, request: SiteRequest) -> StorageResult<SiteResponse> {
        let mut guard = self.stream.lock();
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        let Some(stream) = guard.as_mut() else {
            return Err(StorageError::Unreachable(self.addr.clone()));
        };

        match Self::round_trip(stream, &request) {
            Ok(SiteResponse::Failed(failure)) => Err(failure.into()),
            Ok(response) => Ok(response),
            Err(e) => {
                warn!("Remote call to {} failed: {}", self.addr, e);
                *guard = None;
                Err(e.into())
            }
        }
    }

    fn call_done(&self, request: SiteRequest) -> StorageResult<()> {
        match self.call(request)? {
            SiteResponse::Done => Ok(()),
            other => Err(unexpected(&other)),
        }
    }
}

fn read_exact(stream: &mut TcpStream, buf: &mut [u8]) -> TransportResult<()> {
    stream.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => TransportError::Closed,
        _ => TransportError::Io(e),
    })
}

fn unexpected(response: &SiteResponse) -> StorageError {
    TransportError::UnexpectedResponse(format!("{response:?}")).into()
}

impl SiteStorage for RemoteStore {
    fn describe(&self) -> String {
        format!("remote site at {}", self.addr)
    }

    fn read_metadata(&self, table: &str) -> StorageResult<TableMetadata> {
        match self.call(SiteRequest::ReadMetadata {
            table: table.to_string(),
        })? {
            SiteResponse::Metadata(metadata) => Ok(metadata),
            other => Err(unexpected(&other)),
        }
    }

    fn write_metadata(&self, metadata: &TableMetadata) -> StorageResult<()> {
        self.call_done(SiteRequest::WriteMetadata {
            metadata: metadata.clone(),
        })
    }

    fn create_data(&self, table: &str, header: &[String]) -> StorageResult<()> {
        self.call_done(SiteRequest::CreateData {
            table: table.to_string(),
            header: header.to_vec(),
        })
    }

    fn read_data(&self, table: &str) -> StorageResult<Vec<Row>> {
        match self.call(SiteRequest::ReadData {
            table: table.to_string(),
        })? {
            SiteResponse::Rows(rows) => Ok(rows),
            other => Err(unexpected(&other)),
        }
    }

    fn write_data(&self, table: &str, row: &[String]) -> StorageResult<()> {
        self.call_done(SiteRequest::WriteData {
            table: table.to_string(),
            row: row.to_vec(),
        })
    }

    fn delete_all_rows(&self, table: &str) -> StorageResult<()> {
        self.call_done(SiteRequest::DeleteAllRows {
            table: table.to_string(),
        })
    }

    fn delete_table_files(&self, table: &str) -> StorageResult<()> {
        self.call_done(SiteRequest::DeleteTableFiles {
            table: table.to_string(),
        })
    }

    fn read_column_values(&self, table: &str, column: &str) -> StorageResult<Vec<String>> {
        match self.call(SiteRequest::ReadColumnValues {
            table: table.to_string(),
            column: column.to_string(),
        })? {
            SiteResponse::Values(values) => Ok(values),
            other => Err(unexpected(&other)),
        }
    }

    fn increment_row_count(&self, table: &str) -> StorageResult<()> {
        self.call_done(SiteRequest::IncrementRowCount {
            table: table.to_string(),
        })
    }

    fn decrement_row_count(&self, table: &str, n: u64) -> StorageResult<()> {
        self.call_done(SiteRequest::DecrementRowCount {
            table: table.to_string(),
            n,
        })
    }

    fn read_local_catalog(&self) -> StorageResult<Vec<TableInfo>> {
        match self.call(SiteRequest::ReadLocalCatalog)? {
            SiteResponse::LocalCatalog(entries) => Ok(entries),
            other => Err(unexpected(&other)),
        }
    }

    fn write_local_catalog_entry(&self, info: &TableInfo) -> StorageResult<()> {
        self.call_done(SiteRequest::WriteLocalCatalogEntry { info: info.clone() })
    }

    fn remove_local_catalog_entry(&self, table: &str) -> StorageResult<()> {
        self.call_done(SiteRequest::RemoveLocalCatalogEntry {
            table: table.to_string(),
        })
    }

    fn read_distributed_catalog(&self) -> StorageResult<DistributedCatalog> {
        match self.call(SiteRequest::ReadDistributedCatalog)? {
            SiteResponse::DistributedCatalog(catalog) => Ok(catalog),
            other => Err(unexpected(&other)),
        }
    }

    fn write_distributed_catalog(&self, catalog: &DistributedCatalog) -> StorageResult<()> {
        self.call_done(SiteRequest::WriteDistributedCatalog {
            catalog: catalog.clone(),
        })
    }

    fn write_catalog_entry(&self, table: &str, site: Site) -> StorageResult<()> {
        self.call_done(SiteRequest::WriteCatalogEntry {
            table: table.to_string(),
            site,
        })
    }

    fn close(&self) {
        if let Some(stream) = self.stream.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
            info!("Closed connection to remote site at {}", self.addr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_port_addr() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }

    #[test]
    fn test_unreachable_server() {
        let store = RemoteStore::new(closed_port_addr());
        let err = store.read_distributed_catalog().unwrap_err();
        assert!(err.is_unreachable());
        assert!(!store.is_connected());
    }

    #[test]
    fn test_close_without_connection() {
        let store = RemoteStore::new(closed_port_addr());
        store.close();
        assert!(!store.is_connected());
    }
}
