//! Runtime configuration.
//!
//! Read from an optional TOML file, then overridden by `LECTIO_*`
//! environment variables. Every field has a default so an empty file (or
//! no file) is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_CATALOG_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_CONFIG_FILE: &str = "lectio.toml";

pub const ENV_CATALOG_URL: &str = "LECTIO_CATALOG_URL";
pub const ENV_DATA_DIR: &str = "LECTIO_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL serving `list.json` and `translations/<shortName>.zip`
    pub catalog_url: String,
    /// Overrides the platform data directory
    pub data_dir: Option<PathBuf>,
    /// A stored catalog younger than this is reused by non-forced reloads
    pub catalog_ttl_secs: u64,
    /// Timeout for a single catalog or package request
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            data_dir: None,
            catalog_ttl_secs: 7 * 24 * 60 * 60,
            request_timeout_secs: 600,
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load `path` if it exists, fall back to defaults otherwise, then
    /// apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)?
        } else {
            tracing::debug!("[Config] {:?} not found, using defaults", path);
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_CATALOG_URL).filter(|v| !v.is_empty()) {
            self.catalog_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
