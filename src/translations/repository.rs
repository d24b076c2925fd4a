use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use super::list::{SortOrder, TranslationList};
use crate::catalog::{CatalogClient, RemoteTranslationInfo};
use crate::error::{Error, Result};
use crate::observable::{Observable, Subscription};
use crate::reading::ReadingState;
use crate::storage::{keys, validate_short_name, LocalStore, TranslationContent, TranslationInfo};

type SharedReload = Shared<BoxFuture<'static, Result<()>>>;

struct InFlightReload {
    id: u64,
    result: SharedReload,
}

struct Inner {
    store: LocalStore,
    client: Arc<dyn CatalogClient>,
    reading: ReadingState,
    catalog_ttl: Duration,
    sort_order: Observable<SortOrder>,

    catalog: Observable<Vec<TranslationInfo>>,
    available: Observable<Vec<TranslationInfo>>,
    downloaded: Observable<Vec<TranslationInfo>>,
    list: Observable<TranslationList>,

    /// Held while the stored catalog is read, merged and written back,
    /// while a downloaded flag changes, and while the current translation
    /// is checked or changed.
    catalog_lock: Mutex<()>,
    in_flight: Mutex<Option<InFlightReload>>,
    next_reload_id: AtomicU64,
}

/// Catalog of translations: remote list merged with local download state.
#[derive(Clone)]
pub struct TranslationRepository {
    inner: Arc<Inner>,
}

impl TranslationRepository {
    /// Publishes whatever catalog is already stored.
    pub async fn new(
        store: LocalStore,
        client: Arc<dyn CatalogClient>,
        reading: ReadingState,
        catalog_ttl: Duration,
    ) -> Result<Self> {
        let stored = store.read_translations().await?;
        let sort_order = store
            .read_metadata(keys::TRANSLATION_SORT_ORDER, SortOrder::default().as_str())
            .await?
            .parse::<SortOrder>()
            .unwrap_or_else(|e| {
                tracing::warn!("[Repository] {}, using the default order", e);
                SortOrder::default()
            });
        let repository = Self {
            inner: Arc::new(Inner {
                store,
                client,
                reading,
                catalog_ttl,
                sort_order: Observable::new(sort_order),
                catalog: Observable::new(Vec::new()),
                available: Observable::new(Vec::new()),
                downloaded: Observable::new(Vec::new()),
                list: Observable::new(TranslationList::default()),
                catalog_lock: Mutex::new(()),
                in_flight: Mutex::new(None),
                next_reload_id: AtomicU64::new(0),
            }),
        };
        repository.inner.publish(stored);
        Ok(repository)
    }

    pub fn client(&self) -> Arc<dyn CatalogClient> {
        self.inner.client.clone()
    }

    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    pub fn reading(&self) -> &ReadingState {
        &self.inner.reading
    }

    /// Refresh the catalog from the remote source and merge it with the
    /// local download state.
    ///
    /// Without `force_refresh` a stored catalog younger than the TTL is
    /// reused. A call made while another reload runs joins that reload
    /// and gets its result. On failure nothing stored or published changes.
    pub async fn reload(&self, force_refresh: bool) -> Result<()> {
        let pending = {
            let mut in_flight = self.inner.in_flight.lock().await;
            match in_flight.as_ref() {
                Some(reload) => {
                    tracing::debug!("[Repository] Joining in-flight reload #{}", reload.id);
                    reload.result.clone()
                }
                None => {
                    let id = self.inner.next_reload_id.fetch_add(1, Ordering::Relaxed);
                    let inner = self.inner.clone();
                    // Spawned so the reload completes even if every caller gives up.
                    let task = tokio::spawn(async move {
                        let result = inner.reload_catalog(force_refresh).await;
                        let mut in_flight = inner.in_flight.lock().await;
                        if in_flight.as_ref().map(|r| r.id) == Some(id) {
                            *in_flight = None;
                        }
                        result
                    });
                    let result = async move { task.await.unwrap_or_else(|e| Err(Error::from(e))) }
                        .boxed()
                        .shared();
                    *in_flight = Some(InFlightReload {
                        id,
                        result: result.clone(),
                    });
                    result
                }
            }
        };
        pending.await
    }

    pub fn translations(&self) -> Vec<TranslationInfo> {
        self.inner.catalog.get()
    }

    pub fn available_translations(&self) -> Subscription<Vec<TranslationInfo>> {
        self.inner.available.subscribe()
    }

    pub fn downloaded_translations(&self) -> Subscription<Vec<TranslationInfo>> {
        self.inner.downloaded.subscribe()
    }

    pub fn translation_list(&self) -> TranslationList {
        self.inner.list.get()
    }

    pub fn observe_translation_list(&self) -> Subscription<TranslationList> {
        self.inner.list.subscribe()
    }

    pub fn find(&self, short_name: &str) -> Option<TranslationInfo> {
        self.inner
            .catalog
            .get()
            .into_iter()
            .find(|t| t.short_name == short_name)
    }

    pub fn sort_order(&self) -> SortOrder {
        self.inner.sort_order.get()
    }

    /// Persist the order and publish the partitions sorted by it.
    pub async fn save_sort_order(&self, order: SortOrder) -> Result<()> {
        let _guard = self.inner.catalog_lock.lock().await;
        self.inner
            .store
            .save_metadata(keys::TRANSLATION_SORT_ORDER, order.as_str())
            .await?;
        if self.inner.sort_order.set_if_changed(order) {
            self.inner.publish(self.inner.catalog.get());
        }
        Ok(())
    }

    /// Make `short_name` the current translation. It must be downloaded.
    pub async fn select_translation(&self, short_name: &str) -> Result<()> {
        let _guard = self.inner.catalog_lock.lock().await;
        let translation = self
            .inner
            .store
            .read_translation(short_name)
            .await?
            .ok_or_else(|| Error::TranslationNotFound(short_name.to_string()))?;
        if !translation.downloaded {
            return Err(Error::NotDownloaded(short_name.to_string()));
        }
        self.inner.reading.save_current_translation(short_name).await?;
        self.inner.publish_list();
        Ok(())
    }

    /// Write the content and set the downloaded flag in one transaction.
    /// The first installed translation becomes the current one.
    pub async fn install_translation(
        &self,
        translation: &TranslationInfo,
        content: TranslationContent,
    ) -> Result<TranslationInfo> {
        let installed = translation.with_downloaded(true);
        let _guard = self.inner.catalog_lock.lock().await;
        self.inner
            .store
            .install_translation(installed.clone(), content)
            .await?;
        if self.inner.reading.current_translation().is_empty() {
            self.inner
                .reading
                .save_current_translation(&installed.short_name)
                .await?;
        }
        self.inner.publish(self.inner.store.read_translations().await?);
        tracing::info!("[Repository] Installed {}", installed.short_name);
        Ok(installed)
    }

    /// Delete a downloaded translation. The current one cannot be removed.
    pub async fn remove_translation(&self, translation: &TranslationInfo) -> Result<()> {
        validate_short_name(&translation.short_name)?;
        let _guard = self.inner.catalog_lock.lock().await;
        if self.inner.reading.current_translation() == translation.short_name {
            return Err(Error::RemoveCurrentTranslation(translation.short_name.clone()));
        }
        self.inner
            .store
            .remove_translation(&translation.short_name)
            .await?;
        self.inner.publish(self.inner.store.read_translations().await?);
        tracing::info!("[Repository] Removed {}", translation.short_name);
        Ok(())
    }
}

impl Inner {
    async fn reload_catalog(&self, force_refresh: bool) -> Result<()> {
        if !force_refresh && self.has_fresh_catalog().await? {
            tracing::debug!("[Repository] Stored catalog is recent, skipping fetch");
            self.publish(self.store.read_translations().await?);
            return Ok(());
        }

        let remote = self.client.fetch_catalog().await.map_err(|e| {
            tracing::warn!("[Repository] Failed to fetch catalog: {}", e);
            e
        })?;

        let _guard = self.catalog_lock.lock().await;
        let local = self.store.read_translations().await?;
        let merged = merge_catalog(&local, remote);
        self.store
            .replace_translations(
                merged.clone(),
                vec![(
                    keys::TRANSLATION_LIST_REFRESH_TIMESTAMP,
                    Utc::now().timestamp().to_string(),
                )],
            )
            .await?;
        tracing::info!("[Repository] Catalog refreshed: {} translations", merged.len());
        self.publish(merged);
        Ok(())
    }

    async fn has_fresh_catalog(&self) -> Result<bool> {
        if self.catalog.get().is_empty() && self.store.read_translations().await?.is_empty() {
            return Ok(false);
        }
        let refreshed_at = self
            .store
            .read_metadata(keys::TRANSLATION_LIST_REFRESH_TIMESTAMP, "0")
            .await?
            .parse::<i64>()
            .unwrap_or(0);
        let age = Utc::now().timestamp().saturating_sub(refreshed_at);
        Ok(age >= 0 && (age as u64) < self.catalog_ttl.as_secs())
    }

    fn publish(&self, catalog: Vec<TranslationInfo>) {
        let sort_order = self.sort_order.get();
        let (mut downloaded, mut available): (Vec<_>, Vec<_>) =
            catalog.iter().cloned().partition(|t| t.downloaded);
        sort_order.sort(&mut downloaded);
        sort_order.sort(&mut available);

        self.catalog.set_if_changed(catalog);
        self.available.set_if_changed(available);
        self.downloaded.set_if_changed(downloaded);
        self.publish_list();
    }

    fn publish_list(&self) {
        let list = TranslationList::from_catalog(
            &self.reading.current_translation(),
            &self.catalog.get(),
            self.sort_order.get(),
        );
        self.list.set_if_changed(list);
    }
}

/// Remote entries take their metadata from the remote list and their
/// downloaded flag from the local store. Downloaded translations the
/// remote no longer lists are kept.
pub fn merge_catalog(local: &[TranslationInfo], remote: Vec<RemoteTranslationInfo>) -> Vec<TranslationInfo> {
    let downloaded: HashSet<&str> = local
        .iter()
        .filter(|t| t.downloaded)
        .map(|t| t.short_name.as_str())
        .collect();

    let mut merged: BTreeMap<String, TranslationInfo> = BTreeMap::new();
    for entry in remote {
        if validate_short_name(&entry.short_name).is_err() {
            tracing::warn!("[Repository] Skipping catalog entry with invalid name {:?}", entry.short_name);
            continue;
        }
        let is_downloaded = downloaded.contains(entry.short_name.as_str());
        merged.insert(entry.short_name.clone(), entry.into_translation_info(is_downloaded));
    }
    for translation in local.iter().filter(|t| t.downloaded) {
        merged
            .entry(translation.short_name.clone())
            .or_insert_with(|| translation.clone());
    }
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(short_name: &str, name: &str) -> RemoteTranslationInfo {
        RemoteTranslationInfo {
            short_name: short_name.to_string(),
            name: name.to_string(),
            language: "en_gb".to_string(),
            size: 100,
        }
    }

    #[test]
    fn test_merge_keeps_download_state() {
        let local = vec![
            TranslationInfo::new("KJV", "King James (old name)", "en_gb", 90, true),
            TranslationInfo::new("BBE", "Basic English", "en_gb", 80, false),
        ];
        let merged = merge_catalog(&local, vec![remote("KJV", "King James Version"), remote("BBE", "Basic English")]);

        assert_eq!(merged.len(), 2);
        let kjv = merged.iter().find(|t| t.short_name == "KJV").unwrap();
        assert!(kjv.downloaded);
        assert_eq!(kjv.name, "King James Version");
        assert!(!merged.iter().find(|t| t.short_name == "BBE").unwrap().downloaded);
    }

    #[test]
    fn test_merge_keeps_unlisted_downloads() {
        let local = vec![
            TranslationInfo::new("OLD", "Retired", "en_gb", 10, true),
            TranslationInfo::new("GONE", "Never downloaded", "en_gb", 10, false),
        ];
        let merged = merge_catalog(&local, vec![remote("KJV", "King James Version")]);
        let names: Vec<_> = merged.iter().map(|t| t.short_name.as_str()).collect();
        assert_eq!(names, vec!["KJV", "OLD"]);
    }

    #[test]
    fn test_merge_skips_invalid_names() {
        let merged = merge_catalog(&[], vec![remote("bad name", "x"), remote("KJV", "King James Version")]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_merge_skips_reserved_names() {
        let merged = merge_catalog(
            &[],
            vec![
                remote("metadata", "x"),
                remote("BookNames", "x"),
                remote("sqlite_master", "x"),
                remote("KJV", "King James Version"),
            ],
        );
        let names: Vec<_> = merged.iter().map(|t| t.short_name.as_str()).collect();
        assert_eq!(names, vec!["KJV"]);
    }
}
