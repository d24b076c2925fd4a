/**
 * App Module
 *
 * Builds every component once and wires them together. Nothing here is
 * global: callers own the `App` and pass pieces of it around.
 */
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{CatalogClient, HttpCatalogClient};
use crate::config::Config;
use crate::downloads::DownloadOrchestrator;
use crate::error::Result;
use crate::paths::AppDirs;
use crate::reading::ReadingState;
use crate::settings::SettingsManager;
use crate::storage::LocalStore;
use crate::translations::TranslationRepository;

#[derive(Clone)]
pub struct App {
    pub dirs: AppDirs,
    pub store: LocalStore,
    pub reading: ReadingState,
    pub settings: SettingsManager,
    pub repository: TranslationRepository,
    pub downloads: DownloadOrchestrator,
}

impl App {
    pub async fn init(config: &Config) -> Result<Self> {
        let dirs = AppDirs::resolve(config.data_dir.as_deref())?;
        let client = HttpCatalogClient::new(&config.catalog_url, config.request_timeout())?;
        tracing::info!("[App] Catalog at {}, data in {:?}", config.catalog_url, dirs.data_dir());
        Self::with_client(dirs, Arc::new(client), config.catalog_ttl()).await
    }

    /// Wire the components around an arbitrary catalog source.
    pub async fn with_client(
        dirs: AppDirs,
        client: Arc<dyn CatalogClient>,
        catalog_ttl: Duration,
    ) -> Result<Self> {
        dirs.init()?;
        let store = LocalStore::open(&dirs.database_path())?;
        let reading = ReadingState::load(store.clone()).await?;
        let settings = SettingsManager::load(store.clone()).await;
        let repository =
            TranslationRepository::new(store.clone(), client, reading.clone(), catalog_ttl).await?;
        let downloads = DownloadOrchestrator::new(repository.clone(), dirs.downloads_dir());

        Ok(Self {
            dirs,
            store,
            reading,
            settings,
            repository,
            downloads,
        })
    }
}
