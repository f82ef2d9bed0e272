use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tracing::debug;
use twin_common::{Site, SiteConfig};
use twin_server::database::DatabaseResult;
use twin_server::Database;
use twin_storage::{FileStore, SiteServer, SiteStorage};

/// A REMOTE site daemon serving a temporary data directory, plus the data
/// directory of the LOCAL site that talks to it.
///
/// The daemon runs on its own runtime so the blocking client used by the
/// LOCAL site can be driven from plain test threads.
pub struct TwoSiteCluster {
    dir: TempDir,
    runtime: Option<Runtime>,
    remote_addr: SocketAddr,
}

impl TwoSiteCluster {
    /// Starts the REMOTE daemon on a free loopback port.
    pub fn start() -> Result<Self> {
        let dir = TempDir::new()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("Failed to build runtime")?;

        let store: Arc<dyn SiteStorage> = Arc::new(FileStore::open(dir.path().join("remote"))?);
        let server = runtime.block_on(SiteServer::bind("127.0.0.1:0", store))?;
        let remote_addr = server.local_addr()?;

        runtime.spawn(async move {
            if let Err(e) = server.serve().await {
                debug!("Test daemon stopped: {}", e);
            }
        });

        Ok(Self {
            dir,
            runtime: Some(runtime),
            remote_addr,
        })
    }

    /// Returns the daemon address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Returns the LOCAL site's data directory.
    pub fn local_dir(&self) -> PathBuf {
        self.dir.path().join("local")
    }

    /// Returns the REMOTE site's data directory.
    pub fn remote_dir(&self) -> PathBuf {
        self.dir.path().join("remote")
    }

    /// Configuration of a LOCAL process pointed at the daemon.
    pub fn local_config(&self) -> SiteConfig {
        SiteConfig::builder()
            .current_site(Site::Local)
            .data_dir(self.local_dir())
            .remote(self.remote_addr.ip().to_string(), self.remote_addr.port())
            .build()
    }

    /// Opens a LOCAL database.
    pub fn open_local(&self) -> DatabaseResult<Database> {
        Database::open(self.local_config())
    }

    /// Opens the REMOTE data directory directly, bypassing the daemon.
    pub fn remote_files(&self) -> Result<FileStore> {
        Ok(FileStore::open(self.remote_dir())?)
    }

    /// Stops the daemon and drops every connection it holds.
    pub fn stop_remote(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(Duration::from_secs(1));
        }
    }
}

impl Drop for TwoSiteCluster {
    fn drop(&mut self) {
        self.stop_remote();
    }
}

/// Reads a data file as lines.
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}
