//! In-memory site storage.
//!
//! Used by tests and by embedded setups that do not need persistence. A
//! store can be taken offline to simulate an unreachable site.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use twin_common::{DistributedCatalog, Row, TableInfo, TableMetadata};

use crate::error::{StorageError, StorageResult};
use crate::site::SiteStorage;

#[derive(Debug, Default)]
struct MemoryState {
    metadata: HashMap<String, TableMetadata>,
    data: HashMap<String, Vec<Row>>,
    local_catalog: Vec<TableInfo>,
    distributed_catalog: DistributedCatalog,
}

/// Site storage held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    state: RwLock<MemoryState>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store; `name` only appears in logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Makes every subsequent call fail as unreachable, or restores it.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unreachable(format!("{} is offline", self.name)));
        }
        Ok(())
    }

    fn update_row_count(&self, table: &str, delta: i64) -> StorageResult<()> {
        self.check_online()?;
        let mut state = self.state.write();
        let info = state
            .local_catalog
            .iter_mut()
            .find(|info| info.name == table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;
        info.row_count = if delta >= 0 {
            info.row_count.saturating_add(delta.unsigned_abs())
        } else {
            info.row_count.saturating_sub(delta.unsigned_abs())
        };
        Ok(())
    }
}

impl SiteStorage for MemoryStore {
    fn describe(&self) -> String {
        format!("memory store '{}'", self.name)
    }

    fn read_metadata(&self, table: &str) -> StorageResult<TableMetadata> {
        self.check_online()?;
        self.state
            .read()
            .metadata
            .get(table)
            .cloned()
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))
    }

    fn write_metadata(&self, metadata: &TableMetadata) -> StorageResult<()> {
        self.check_online()?;
        self.state
            .write()
            .metadata
            .insert(metadata.name.clone(), metadata.clone());
        Ok(())
    }

    fn create_data(&self, table: &str, header: &[String]) -> StorageResult<()> {
        self.check_online()?;
        self.state
            .write()
            .data
            .insert(table.to_string(), vec![header.to_vec()]);
        Ok(())
    }

    fn read_data(&self, table: &str) -> StorageResult<Vec<Row>> {
        self.check_online()?;
        self.state
            .read()
            .data
            .get(table)
            .cloned()
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))
    }

    fn write_data(&self, table: &str, row: &[String]) -> StorageResult<()> {
        self.check_online()?;
        let mut state = self.state.write();
        let rows = state
            .data
            .get_mut(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;
        rows.push(row.to_vec());
        Ok(())
    }

    fn delete_all_rows(&self, table: &str) -> StorageResult<()> {
        self.check_online()?;
        let mut state = self.state.write();
        let rows = state
            .data
            .get_mut(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;
        rows.truncate(1);
        Ok(())
    }

    fn delete_table_files(&self, table: &str) -> StorageResult<()> {
        self.check_online()?;
        let mut state = self.state.write();
        state.metadata.remove(table);
        state.data.remove(table);
        Ok(())
    }

    fn increment_row_count(&self, table: &str) -> StorageResult<()> {
        self.update_row_count(table, 1)
    }

    fn decrement_row_count(&self, table: &str, n: u64) -> StorageResult<()> {
        self.update_row_count(table, -i64::try_from(n).unwrap_or(i64::MAX))
    }

    fn read_local_catalog(&self) -> StorageResult<Vec<TableInfo>> {
        self.check_online()?;
        Ok(self.state.read().local_catalog.clone())
    }

    fn write_local_catalog_entry(&self, info: &TableInfo) -> StorageResult<()> {
        self.check_online()?;
        let mut state = self.state.write();
        match state.local_catalog.iter_mut().find(|e| e.name == info.name) {
            Some(entry) => *entry = info.clone(),
            None => state.local_catalog.push(info.clone()),
        }
        Ok(())
    }

    fn remove_local_catalog_entry(&self, table: &str) -> StorageResult<()> {
        self.check_online()?;
        self.state.write().local_catalog.retain(|e| e.name != table);
        Ok(())
    }

    fn read_distributed_catalog(&self) -> StorageResult<DistributedCatalog> {
        self.check_online()?;
        Ok(self.state.read().distributed_catalog.clone())
    }

    fn write_distributed_catalog(&self, catalog: &DistributedCatalog) -> StorageResult<()> {
        self.check_online()?;
        self.state.write().distributed_catalog = catalog.clone();
        Ok(())
    }
}
