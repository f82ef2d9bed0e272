//! Credential check.
//!
//! The credentials file holds one `user|bcrypt-hash` line per user.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};
use twin_common::FIELD_DELIMITER;

/// A credentials file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    cost: u32,
}

impl CredentialStore {
    /// Opens the credentials file at `path`. It need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Sets the bcrypt cost used for new entries.
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if `password` matches the stored hash of `user`.
    /// Unknown users and malformed hashes never match.
    pub fn verify(&self, user: &str, password: &str) -> Result<bool> {
        let Some(hash) = self.hash_of(user)? else {
            debug!("Unknown user '{}'", user);
            return Ok(false);
        };

        match bcrypt::verify(password, &hash) {
            Ok(valid) => Ok(valid),
            Err(e) => {
                warn!("Stored hash of '{}' is unusable: {}", user, e);
                Ok(false)
            }
        }
    }

    /// Appends a new user.
    pub fn add_user(&self, user: &str, password: &str) -> Result<()> {
        let user = user.trim();
        if user.is_empty() || user.contains(FIELD_DELIMITER) || user.contains(char::is_whitespace) {
            bail!("invalid user name '{user}'");
        }
        if password.is_empty() {
            bail!("password must not be empty");
        }
        if self.hash_of(user)?.is_some() {
            bail!("user '{user}' already exists");
        }

        let hash = bcrypt::hash(password, self.cost).context("Failed to hash password")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        writeln!(file, "{user}{FIELD_DELIMITER}{hash}")?;
        Ok(())
    }

    fn hash_of(&self, user: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;

        Ok(content.lines().find_map(|line| {
            let (name, hash) = line.trim().split_once(FIELD_DELIMITER)?;
            (name == user).then(|| hash.to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_COST: u32 = 4;

    fn store(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("users.dat")).with_cost(TEST_COST)
    }

    #[test]
    fn test_add_and_verify() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.add_user("alice", "s3cret").unwrap();

        assert!(store.verify("alice", "s3cret").unwrap());
        assert!(!store.verify("alice", "wrong").unwrap());
        assert!(!store.verify("bob", "s3cret").unwrap());

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("alice|$2"));
    }

    #[test]
    fn test_duplicate_and_invalid_users() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.add_user("alice", "one").unwrap();
        assert!(store.add_user("alice", "two").is_err());
        assert!(store.add_user("a|b", "pw").is_err());
        assert!(store.add_user("carol", "").is_err());
    }

    #[test]
    fn test_missing_file_and_bad_hash() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(!store.verify("alice", "pw").unwrap());

        fs::write(store.path(), "alice|not-a-hash\n").unwrap();
        assert!(!store.verify("alice", "pw").unwrap());
    }
}
