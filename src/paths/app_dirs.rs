/**
 * App Directories Module
 *
 * All app data is stored under:
 * - macOS: ~/Library/Application Support/org.lectio/
 * - Windows: %APPDATA%/org.lectio/
 * - Linux: ~/.local/share/org.lectio/
 *
 * A data directory set in the config replaces the platform default.
 */
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Bundle identifier for the app
pub const BUNDLE_ID: &str = "org.lectio";

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "lectio.db";

/// Get the platform default data directory
pub fn get_default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(BUNDLE_ID))
        .ok_or_else(|| Error::Config("cannot determine the application data directory".to_string()))
}

/// Resolved locations of everything the core writes to disk.
#[derive(Debug, Clone)]
pub struct AppDirs {
    data_dir: PathBuf,
}

impl AppDirs {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Use the configured directory, or the platform default.
    pub fn resolve(configured: Option<&Path>) -> Result<Self> {
        match configured {
            Some(dir) => Ok(Self::new(dir)),
            None => Ok(Self::new(get_default_data_dir()?)),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns: {data_dir}/lectio.db
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// Returns: {data_dir}/downloads/
    ///
    /// Packages are written here while in transit and removed after install.
    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join("downloads")
    }

    /// Create all directories if they don't exist.
    pub fn init(&self) -> Result<()> {
        for dir in [self.data_dir.clone(), self.downloads_dir()] {
            ensure_dir_exists(&dir)?;
        }
        tracing::debug!("[Paths] App directories initialized: {:?}", self.data_dir);
        Ok(())
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
