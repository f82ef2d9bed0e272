//! Site resolution and distributed catalog synchronization.
//!
//! A LOCAL process owns a store for its own disk and a client for the
//! REMOTE daemon. A REMOTE process has only its own store: every table
//! catalogued LOCAL is out of its reach.

use std::sync::Arc;

use tracing::{debug, warn};
use twin_common::{DistributedCatalog, Site, TableMetadata};
use twin_sql::{SchemaProvider, ValidationError};
use twin_storage::{SiteStorage, StorageError};

use super::error::{DatabaseError, DatabaseResult};

/// Maps sites to the stores that reach them.
#[derive(Clone)]
pub struct SiteResolver {
    current: Site,
    own: Arc<dyn SiteStorage>,
    counterpart: Option<Arc<dyn SiteStorage>>,
}

impl std::fmt::Debug for SiteResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteResolver")
            .field("current", &self.current)
            .field("own", &self.own.describe())
            .field("counterpart", &self.counterpart.as_ref().map(|s| s.describe()))
            .finish()
    }
}

impl SiteResolver {
    /// Creates a resolver for a process running as `current`.
    pub fn new(
        current: Site,
        own: Arc<dyn SiteStorage>,
        counterpart: Option<Arc<dyn SiteStorage>>,
    ) -> Self {
        Self {
            current,
            own,
            counterpart,
        }
    }

    /// Returns the site this process runs as.
    pub fn current_site(&self) -> Site {
        self.current
    }

    /// Returns the process's own store.
    pub fn own(&self) -> &dyn SiteStorage {
        self.own.as_ref()
    }

    /// Returns the counterpart store, if this process has one.
    pub fn counterpart(&self) -> Option<&dyn SiteStorage> {
        self.counterpart.as_deref()
    }

    /// Returns the store holding tables of `site`, if reachable.
    pub fn try_store_for(&self, site: Site) -> Option<&dyn SiteStorage> {
        if site == self.current {
            Some(self.own())
        } else {
            self.counterpart()
        }
    }

    /// Returns the store holding tables of `site`.
    pub fn store_for(&self, site: Site) -> DatabaseResult<&dyn SiteStorage> {
        self.try_store_for(site).ok_or_else(|| {
            DatabaseError::SiteUnreachable(format!(
                "{site} site cannot be reached from the {} site",
                self.current
            ))
        })
    }

    /// Reads this process's copy of the distributed catalog.
    pub fn catalog(&self) -> DatabaseResult<DistributedCatalog> {
        Ok(self.own.read_distributed_catalog()?)
    }

    /// Overwrites the own catalog copy with the counterpart's. Only a LOCAL
    /// process pulls; failures leave the own copy in place.
    pub fn refresh(&self) {
        if self.current != Site::Local {
            return;
        }
        let Some(remote) = self.counterpart() else {
            return;
        };

        match remote.read_distributed_catalog() {
            Ok(catalog) => {
                if let Err(e) = self.own.write_distributed_catalog(&catalog) {
                    warn!("Failed to store refreshed distributed catalog: {}", e);
                } else {
                    debug!("Refreshed distributed catalog ({} tables)", catalog.len());
                }
            }
            Err(e) => warn!(
                "Failed to refresh distributed catalog from {}: {}",
                remote.describe(),
                e
            ),
        }
    }

    /// Pushes the own catalog copy to the counterpart. Only a LOCAL
    /// process publishes; failures are logged.
    pub fn publish(&self) {
        if self.current != Site::Local {
            return;
        }
        let Some(remote) = self.counterpart() else {
            return;
        };

        let result = self
            .own
            .read_distributed_catalog()
            .and_then(|catalog| remote.write_distributed_catalog(&catalog));
        if let Err(e) = result {
            warn!(
                "Failed to publish distributed catalog to {}: {}",
                remote.describe(),
                e
            );
        }
    }

    /// Releases the counterpart connection.
    pub fn close(&self) {
        if let Some(remote) = self.counterpart() {
            remote.close();
        }
    }
}

/// A catalogued table together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTable {
    /// Owning site.
    pub site: Site,
    /// Column definitions.
    pub metadata: TableMetadata,
}

impl ResolvedTable {
    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Schema lookups against one snapshot of the distributed catalog.
pub struct SchemaView<'a> {
    sites: &'a SiteResolver,
    catalog: &'a DistributedCatalog,
}

impl<'a> SchemaView<'a> {
    /// Creates a view.
    pub fn new(sites: &'a SiteResolver, catalog: &'a DistributedCatalog) -> Self {
        Self { sites, catalog }
    }

    /// Finds a table's site and metadata. A catalogued table without
    /// metadata is a catalog inconsistency.
    pub fn resolve(&self, table: &str) -> DatabaseResult<ResolvedTable> {
        let site = self
            .catalog
            .site_of(table)
            .ok_or_else(|| ValidationError::TableNotFound(table.to_string()))?;
        let store = self.sites.store_for(site)?;

        match store.read_metadata(table) {
            Ok(metadata) => Ok(ResolvedTable { site, metadata }),
            Err(StorageError::TableNotFound(_)) => Err(DatabaseError::CatalogInconsistency(
                format!("table '{table}' is catalogued at {site} but has no metadata there"),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

impl SchemaProvider for SchemaView<'_> {
    fn table_exists(&self, table: &str) -> bool {
        self.catalog.contains(table)
    }

    fn table_metadata(&self, table: &str) -> Option<TableMetadata> {
        let site = self.catalog.site_of(table)?;
        let store = self.sites.try_store_for(site)?;
        match store.read_metadata(table) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("Cannot read metadata of '{}': {}", table, e);
                None
            }
        }
    }
}
