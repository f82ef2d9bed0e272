//! Configuration loading for the shell.
//!
//! Values come from a TOML file, then command-line flags (or their
//! `TWIN_*` environment variables) override them.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use twin_common::{Site, SiteConfig};

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// `--site`
    pub site: Option<String>,
    /// `--data-dir`
    pub data_dir: Option<PathBuf>,
    /// `--remote host:port`
    pub remote: Option<String>,
    /// `--credentials`
    pub credentials_file: Option<PathBuf>,
}

/// Loads the configuration file, or the default one, and applies the
/// overrides.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<SiteConfig> {
    let mut config = match path {
        Some(path) => SiteConfig::from_file(path).context("Failed to load config file")?,
        None => load_default()?,
    };
    apply(&mut config, overrides)?;
    Ok(config)
}

/// Looks in the following locations:
/// 1. ~/.config/twindb/config.toml
/// 2. ~/.twindb/config.toml
/// 3. Returns default if not found
pub fn load_default() -> Result<SiteConfig> {
    let candidates = [
        default_config_path(),
        dirs::home_dir().map(|home| home.join(".twindb").join("config.toml")),
    ];

    for path in candidates.into_iter().flatten() {
        if path.exists() {
            return SiteConfig::from_file(&path);
        }
    }
    Ok(SiteConfig::default())
}

/// Returns the default configuration file path.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("twindb").join("config.toml"))
}

fn apply(config: &mut SiteConfig, overrides: &Overrides) -> Result<()> {
    if let Some(site) = &overrides.site {
        config.current_site = site.parse::<Site>()?;
    }
    if let Some(dir) = &overrides.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(remote) = &overrides.remote {
        let (host, port) = parse_remote(remote)?;
        config.remote.host = host;
        config.remote.port = port;
    }
    if let Some(path) = &overrides.credentials_file {
        config.credentials_file = Some(path.clone());
    }
    Ok(())
}

/// Splits `host:port`.
pub fn parse_remote(addr: &str) -> Result<(String, u16)> {
    let Some((host, port)) = addr.rsplit_once(':') else {
        bail!("remote address '{addr}' must be host:port");
    };
    if host.is_empty() {
        bail!("remote address '{addr}' has no host");
    }
    let port = port
        .parse::<u16>()
        .with_context(|| format!("invalid port in remote address '{addr}'"))?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_remote() {
        assert_eq!(
            parse_remote("10.0.0.7:7878").unwrap(),
            ("10.0.0.7".to_string(), 7878)
        );
        assert!(parse_remote("10.0.0.7").is_err());
        assert!(parse_remote(":7878").is_err());
        assert!(parse_remote("host:port").is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                current_site = "REMOTE"
                data_dir = "/srv/twin"
                auto_commit = false

                [remote]
                host = "db.example.com"
            "#,
        )
        .unwrap();

        let overrides = Overrides {
            site: Some("local".to_string()),
            remote: Some("127.0.0.1:9000".to_string()),
            ..Default::default()
        };
        let config = load(Some(&path), &overrides).unwrap();

        assert_eq!(config.current_site, Site::Local);
        assert_eq!(config.data_dir, PathBuf::from("/srv/twin"));
        assert!(!config.auto_commit);
        assert_eq!(config.remote.host, "127.0.0.1");
        assert_eq!(config.remote.port, 9000);
    }

    #[test]
    fn test_invalid_site_flag() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let overrides = Overrides {
            site: Some("elsewhere".to_string()),
            ..Default::default()
        };
        assert!(load(Some(&path), &overrides).is_err());
    }
}
