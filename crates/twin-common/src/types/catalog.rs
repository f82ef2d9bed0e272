//! Catalog entries.

use serde::{Deserialize, Serialize};

use super::{now_millis, Site};

/// Local catalog entry: row count and creation time of a table stored at
/// this site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Number of data rows physically present.
    pub row_count: u64,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl TableInfo {
    /// Creates an entry for a freshly created, empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            row_count: 0,
            created_at: now_millis(),
        }
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Sets the row count.
    #[must_use]
    pub fn with_row_count(mut self, row_count: u64) -> Self {
        self.row_count = row_count;
        self
    }
}

/// Distributed catalog: table name to owning site, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedCatalog {
    entries: Vec<(String, Site)>,
}

impl DistributedCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the owning site of a table.
    #[must_use]
    pub fn site_of(&self, table: &str) -> Option<Site> {
        self.entries
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, site)| *site)
    }

    /// Returns true if the table is catalogued.
    #[must_use]
    pub fn contains(&self, table: &str) -> bool {
        self.site_of(table).is_some()
    }

    /// Records the owning site of a table, replacing any previous entry.
    pub fn insert(&mut self, table: impl Into<String>, site: Site) {
        let table = table.into();
        match self.entries.iter_mut().find(|(name, _)| *name == table) {
            Some(entry) => entry.1 = site,
            None => self.entries.push((table, site)),
        }
    }

    /// Removes a table, returning its site.
    pub fn remove(&mut self, table: &str) -> Option<Site> {
        let idx = self.entries.iter().position(|(name, _)| name == table)?;
        Some(self.entries.remove(idx).1)
    }

    /// Iterates over `(table, site)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Site)> {
        self.entries.iter().map(|(name, site)| (name.as_str(), *site))
    }

    /// Returns the catalogued table names.
    #[must_use]
    pub fn tables(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Returns the number of catalogued tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no table is catalogued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Site)> for DistributedCatalog {
    fn from_iter<I: IntoIterator<Item = (String, Site)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (table, site) in iter {
            catalog.insert(table, site);
        }
        catalog
    }
}
