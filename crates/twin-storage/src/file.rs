//! File-backed site storage.
//!
//! One directory holds everything a site stores:
//!
//! ```text
//! <root>/
//!   distributed_data_dictionary.dat
//!   local_data_dictionary.dat
//!   <table>.metadata
//!   <table>.dat
//! ```
//!
//! Files are opened per call and closed before returning. Rewrites go to a
//! sibling temporary file that is then renamed over the original.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use twin_common::{
    data_file_name, metadata_file_name, DistributedCatalog, Row, TableInfo, TableMetadata,
    DISTRIBUTED_CATALOG_FILE, DISTRIBUTED_CATALOG_HEADER, LOCAL_CATALOG_FILE,
    LOCAL_CATALOG_HEADER,
};

use crate::error::{StorageError, StorageResult};
use crate::layout;
use crate::site::SiteStorage;

/// Site storage on the local file system.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory and empty
    /// catalogs if they do not exist yet.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let store = Self { root };
        store.ensure_file(DISTRIBUTED_CATALOG_FILE, DISTRIBUTED_CATALOG_HEADER)?;
        store.ensure_file(LOCAL_CATALOG_FILE, LOCAL_CATALOG_HEADER)?;

        info!("Opened file store at {}", store.root.display());
        Ok(store)
    }

    /// Returns the data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_file(&self, name: &str, header: &str) -> StorageResult<()> {
        let path = self.root.join(name);
        if !path.exists() {
            debug!("Creating {}", path.display());
            write_atomically(&path, &format!("{header}\n"))?;
        }
        Ok(())
    }

    fn metadata_path(&self, table: &str) -> PathBuf {
        self.root.join(metadata_file_name(table))
    }

    fn data_path(&self, table: &str) -> PathBuf {
        self.root.join(data_file_name(table))
    }

    fn read_table_file(&self, table: &str, path: &Path) -> StorageResult<String> {
        fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::TableNotFound(table.to_string()),
            _ => StorageError::Io(e),
        })
    }

    fn update_row_count(&self, table: &str, delta: i64) -> StorageResult<()> {
        let mut entries = self.read_local_catalog()?;
        let info = entries
            .iter_mut()
            .find(|info| info.name == table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;

        info.row_count = if delta >= 0 {
            info.row_count.saturating_add(delta.unsigned_abs())
        } else {
            info.row_count.saturating_sub(delta.unsigned_abs())
        };
        debug!("Row count of {} is now {}", table, info.row_count);

        self.write_local_catalog(&entries)
    }

    fn write_local_catalog(&self, entries: &[TableInfo]) -> StorageResult<()> {
        write_atomically(
            &self.root.join(LOCAL_CATALOG_FILE),
            &layout::encode_local_catalog(entries),
        )
    }
}

/// Writes `content` to a temporary sibling and renames it over `path`.
fn write_atomically(path: &Path, content: &str) -> StorageResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl SiteStorage for FileStore {
    fn describe(&self) -> String {
        format!("file store at {}", self.root.display())
    }

    fn read_metadata(&self, table: &str) -> StorageResult<TableMetadata> {
        let content = self.read_table_file(table, &self.metadata_path(table))?;
        layout::decode_metadata(table, &content)
    }

    fn write_metadata(&self, metadata: &TableMetadata) -> StorageResult<()> {
        write_atomically(
            &self.metadata_path(&metadata.name),
            &layout::encode_metadata(metadata),
        )
    }

    fn create_data(&self, table: &str, header: &[String]) -> StorageResult<()> {
        write_atomically(&self.data_path(table), &layout::encode_rows(&[header.to_vec()]))
    }

    fn read_data(&self, table: &str) -> StorageResult<Vec<Row>> {
        let content = self.read_table_file(table, &self.data_path(table))?;
        Ok(layout::decode_rows(&content))
    }

    fn write_data(&self, table: &str, row: &[String]) -> StorageResult<()> {
        let path = self.data_path(table);
        if !path.exists() {
            return Err(StorageError::TableNotFound(table.to_string()));
        }
        let mut file = OpenOptions::new().append(true).open(&path)?;
        writeln!(file, "{}", layout::encode_record(row))?;
        Ok(())
    }

    fn delete_all_rows(&self, table: &str) -> StorageResult<()> {
        let rows = self.read_data(table)?;
        let header = rows
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::corrupted(data_file_name(table), "missing header row"))?;
        write_atomically(&self.data_path(table), &layout::encode_rows(&[header]))
    }

    fn delete_table_files(&self, table: &str) -> StorageResult<()> {
        for path in [self.metadata_path(table), self.data_path(table)] {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn increment_row_count(&self, table: &str) -> StorageResult<()> {
        self.update_row_count(table, 1)
    }

    fn decrement_row_count(&self, table: &str, n: u64) -> StorageResult<()> {
        self.update_row_count(table, -i64::try_from(n).unwrap_or(i64::MAX))
    }

    fn read_local_catalog(&self) -> StorageResult<Vec<TableInfo>> {
        let content = fs::read_to_string(self.root.join(LOCAL_CATALOG_FILE))?;
        layout::decode_local_catalog(&content)
    }

    fn write_local_catalog_entry(&self, info: &TableInfo) -> StorageResult<()> {
        let mut entries = self.read_local_catalog()?;
        match entries.iter_mut().find(|entry| entry.name == info.name) {
            Some(entry) => *entry = info.clone(),
            None => entries.push(info.clone()),
        }
        self.write_local_catalog(&entries)
    }

    fn remove_local_catalog_entry(&self, table: &str) -> StorageResult<()> {
        let mut entries = self.read_local_catalog()?;
        entries.retain(|entry| entry.name != table);
        self.write_local_catalog(&entries)
    }

    fn read_distributed_catalog(&self) -> StorageResult<DistributedCatalog> {
        let content = fs::read_to_string(self.root.join(DISTRIBUTED_CATALOG_FILE))?;
        layout::decode_distributed_catalog(&content)
    }

    fn write_distributed_catalog(&self, catalog: &DistributedCatalog) -> StorageResult<()> {
        write_atomically(
            &self.root.join(DISTRIBUTED_CATALOG_FILE),
            &layout::encode_distributed_catalog(catalog),
        )
    }
}
