//! Site configuration.
//!
//! A TwinDB process is configured with the site it runs as, where its data
//! lives and how to reach the counterpart daemon.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_REMOTE_HOST, DEFAULT_REMOTE_PORT, LOG_DIR_NAME};
use crate::types::Site;

/// Configuration of one TwinDB process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site this process runs as.
    #[serde(default = "default_site")]
    pub current_site: Site,

    /// Directory holding catalogs, metadata, data and the pending log.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log directory (defaults to data_dir/logs).
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Initial auto-commit mode of new sessions.
    #[serde(default = "default_auto_commit")]
    pub auto_commit: bool,

    /// File of `user|bcrypt-hash` lines; login is skipped when unset.
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,

    /// Address of the counterpart site daemon.
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// Address of the remote site daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Daemon host.
    #[serde(default = "default_remote_host")]
    pub host: String,

    /// Daemon port.
    #[serde(default = "default_remote_port")]
    pub port: u16,
}

fn default_site() -> Site {
    Site::Local
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_auto_commit() -> bool {
    true
}

fn default_remote_host() -> String {
    DEFAULT_REMOTE_HOST.to_string()
}

fn default_remote_port() -> u16 {
    DEFAULT_REMOTE_PORT
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: default_remote_host(),
            port: default_remote_port(),
        }
    }
}

impl RemoteConfig {
    /// Returns the `host:port` address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            current_site: default_site(),
            data_dir: default_data_dir(),
            log_dir: None,
            auto_commit: default_auto_commit(),
            credentials_file: None,
            remote: RemoteConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Converts configuration to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns the effective log directory.
    pub fn effective_log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(LOG_DIR_NAME))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            bail!("data_dir must not be empty");
        }
        if self.current_site == Site::Local {
            if self.remote.host.trim().is_empty() {
                bail!("remote.host must be set for a LOCAL site");
            }
            if self.remote.port == 0 {
                bail!("remote.port must be non-zero for a LOCAL site");
            }
        }
        Ok(())
    }

    /// Creates a builder for configuration.
    pub fn builder() -> SiteConfigBuilder {
        SiteConfigBuilder::new()
    }
}

/// Builder for site configuration.
#[derive(Default)]
pub struct SiteConfigBuilder {
    config: SiteConfig,
}

impl SiteConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the site this process runs as.
    pub fn current_site(mut self, site: Site) -> Self {
        self.config.current_site = site;
        self
    }

    /// Sets the data directory.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Sets the log directory.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = Some(dir.into());
        self
    }

    /// Sets the initial auto-commit mode.
    pub fn auto_commit(mut self, enabled: bool) -> Self {
        self.config.auto_commit = enabled;
        self
    }

    /// Sets the remote daemon address.
    pub fn remote(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.remote = RemoteConfig {
            host: host.into(),
            port,
        };
        self
    }

    /// Sets the credentials file.
    pub fn credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.credentials_file = Some(path.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SiteConfig {
        self.config
    }
}
