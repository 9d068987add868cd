//! Configuration management for the Switchboard CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use switchboard::directory::DirectoryConfig;
use switchboard::rpc::{ClientConfig, ServerConfig};
use tracing::debug;

/// Name of the configuration file searched for.
pub const CONFIG_FILE: &str = "switchboard.toml";

/// Switchboard configuration, one table per component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

impl Config {
    /// Load config from switchboard.toml in the current or parent directories.
    pub fn load() -> Result<Self> {
        let start = std::env::current_dir().context("Failed to read current directory")?;
        match find_config_file(&start) {
            Some(path) => {
                debug!("Using config {}", path.display());
                Self::load_from(&path)
            }
            None => {
                debug!("No {} found, using defaults", CONFIG_FILE);
                Ok(Config::default())
            }
        }
    }

    /// Load config from a specific file.
    ///
    /// Lease settings that would let announced entries lapse are rejected
    /// here rather than when a server starts.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .directory
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

/// Find switchboard.toml in `start` or its parents.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}
