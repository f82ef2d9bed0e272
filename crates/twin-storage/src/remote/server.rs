//! TCP server exposing a site's storage to its counterpart.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use super::frame::{self, HEADER_SIZE};
use super::protocol::{dispatch, RemoteFailure, SiteRequest, SiteResponse};
use super::TransportResult;
use crate::site::SiteStorage;

/// Serves a [`SiteStorage`] over TCP, one task per connection.
pub struct SiteServer {
    listener: TcpListener,
    store: Arc<dyn SiteStorage>,
}

impl std::fmt::Debug for SiteServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteServer")
            .field("listener", &self.listener.local_addr().ok())
            .field("store", &self.store.describe())
            .finish()
    }
}

impl SiteServer {
    /// Binds the listener. Use port 0 to pick a free port.
    pub async fn bind(addr: &str, store: Arc<dyn SiteStorage>) -> TransportResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "Site server listening on {} for {}",
            listener.local_addr()?,
            store.describe()
        );
        Ok(Self { listener, store })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until the process ends.
    pub async fn serve(self) -> TransportResult<()> {
        self.serve_until(std::future::pending()).await
    }

    /// Serves until `shutdown` completes. Connections already accepted keep
    /// running on their own tasks.
    pub async fn serve_until<F>(self, shutdown: F) -> TransportResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("Accepted connection from {}", addr);
                            let store = Arc::clone(&self.store);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(store, stream).await {
                                    warn!("Connection error from {}: {}", addr, e);
                                }
                                debug!("Connection from {} closed", addr);
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                () = &mut shutdown => {
                    info!("Site server shutdown requested");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Handles one client connection until it closes.
async fn handle_connection(
    store: Arc<dyn SiteStorage>,
    mut stream: TcpStream,
) -> TransportResult<()> {
    stream.set_nodelay(true)?;
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        if buf.len() >= HEADER_SIZE {
            // reject garbage before buffering a bogus length
            frame::payload_len(&buf)?;
        }

        while let Some(size) = frame::frame_size(&buf) {
            let frame_data = buf.split_to(size).freeze();
            let request: SiteRequest = frame::decode(frame_data)?;
            debug!("Serving {}", request.name());

            let store = Arc::clone(&store);
            let response = tokio::task::spawn_blocking(move || dispatch(store.as_ref(), request))
                .await
                .unwrap_or_else(|e| {
                    SiteResponse::Failed(RemoteFailure::Other(format!("request task failed: {e}")))
                });

            let encoded = frame::encode(&response)?;
            stream.write_all(&encoded).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, RemoteStore};
    use twin_common::types::{Column, DataType};
    use twin_common::{Site, TableInfo, TableMetadata};

    #[tokio::test]
    async fn test_remote_store_round_trip() {
        let backing = Arc::new(MemoryStore::new("remote"));
        let server = SiteServer::bind("127.0.0.1:0", backing.clone()).await.unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_until(async {
            let _ = stop_rx.await;
        }));

        let result = tokio::task::spawn_blocking(move || {
            let client = RemoteStore::new(addr);
            client.ping().unwrap();
            assert!(client.is_connected());

            let table = TableMetadata::new(
                "employee",
                vec![
                    Column::new("id", DataType::Int).primary_key(),
                    Column::new("name", DataType::Text),
                ],
            );
            client.write_metadata(&table).unwrap();
            client.create_data("employee", &table.column_names()).unwrap();
            client.write_local_catalog_entry(&TableInfo::new("employee")).unwrap();
            client.write_catalog_entry("employee", Site::Remote).unwrap();
            client
                .write_data("employee", &["1".to_string(), "alice".to_string()])
                .unwrap();
            client.increment_row_count("employee").unwrap();

            let values = client.read_column_values("employee", "name").unwrap();
            let missing = client.read_metadata("department").unwrap_err();
            client.close();
            (values, missing, client.is_connected())
        })
        .await
        .unwrap();

        assert_eq!(result.0, vec!["alice"]);
        assert!(matches!(result.1, crate::StorageError::TableNotFound(_)));
        assert!(!result.2);
        assert_eq!(backing.read_local_catalog().unwrap()[0].row_count, 1);
        assert!(backing.read_distributed_catalog().unwrap().contains("employee"));

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
