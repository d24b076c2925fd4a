pub mod database;
pub mod models;

pub use database::{keys, validate_short_name, Database};
pub use models::{ParallelText, TranslationContent, TranslationInfo, Verse, VerseIndex, VerseWithParallel};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

/// Async handle on the local SQLite store.
///
/// `rusqlite::Connection` is not `Sync`, so the store keeps only the path
/// and every operation opens its own connection on the blocking pool.
#[derive(Clone, Debug)]
pub struct LocalStore {
    db_path: Arc<PathBuf>,
}

impl LocalStore {
    /// Create the schema if needed and return a handle
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::new(db_path)?;
        drop(db);
        tracing::debug!("[Store] Opened {:?}", db_path);
        Ok(Self {
            db_path: Arc::new(db_path.to_path_buf()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let db = Database::open(&db_path)?;
            op(&db)
        })
        .await?
    }

    // --- Metadata ---

    pub async fn read_metadata(&self, key: &str, default_value: &str) -> Result<String> {
        let (key, default_value) = (key.to_string(), default_value.to_string());
        self.run(move |db| db.read_metadata(&key, &default_value)).await
    }

    pub async fn read_metadata_many(
        &self,
        keys: &[(&'static str, &'static str)],
    ) -> Result<HashMap<String, String>> {
        let keys = keys.to_vec();
        self.run(move |db| db.read_metadata_many(&keys)).await
    }

    pub async fn save_metadata(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.run(move |db| db.save_metadata(&key, &value)).await
    }

    pub async fn save_metadata_many(&self, entries: Vec<(&'static str, String)>) -> Result<()> {
        self.run(move |db| db.save_metadata_many(&entries)).await
    }

    // --- Translation catalog ---

    pub async fn read_translations(&self) -> Result<Vec<TranslationInfo>> {
        self.run(|db| db.read_translations()).await
    }

    pub async fn read_translation(&self, short_name: &str) -> Result<Option<TranslationInfo>> {
        let short_name = short_name.to_string();
        self.run(move |db| db.read_translation(&short_name)).await
    }

    pub async fn has_downloaded_translation(&self) -> Result<bool> {
        self.run(|db| db.has_downloaded_translation()).await
    }

    pub async fn replace_translations(
        &self,
        translations: Vec<TranslationInfo>,
        metadata: Vec<(&'static str, String)>,
    ) -> Result<()> {
        self.run(move |db| db.replace_translations(&translations, &metadata))
            .await
    }

    pub async fn save_translation(&self, translation: TranslationInfo) -> Result<()> {
        self.run(move |db| db.save_translation(&translation)).await
    }

    pub async fn install_translation(
        &self,
        translation: TranslationInfo,
        content: TranslationContent,
    ) -> Result<()> {
        self.run(move |db| db.install_translation(&translation, &content))
            .await
    }

    pub async fn remove_translation(&self, short_name: &str) -> Result<()> {
        let short_name = short_name.to_string();
        self.run(move |db| db.remove_translation(&short_name)).await
    }

    // --- Verses ---

    pub async fn save_chapter(
        &self,
        short_name: &str,
        book_index: i32,
        chapter_index: i32,
        verses: Vec<String>,
    ) -> Result<()> {
        let short_name = short_name.to_string();
        self.run(move |db| db.save_chapter(&short_name, book_index, chapter_index, &verses))
            .await
    }

    pub async fn read_book_names(&self, short_name: &str) -> Result<Vec<String>> {
        let short_name = short_name.to_string();
        self.run(move |db| db.read_book_names(&short_name)).await
    }

    pub async fn read_verses(
        &self,
        short_name: &str,
        book_index: i32,
        chapter_index: i32,
    ) -> Result<Vec<Verse>> {
        let short_name = short_name.to_string();
        self.run(move |db| db.read_verses(&short_name, book_index, chapter_index))
            .await
    }

    pub async fn read_verses_with_parallel(
        &self,
        short_name: &str,
        parallel: Vec<String>,
        book_index: i32,
        chapter_index: i32,
    ) -> Result<Vec<VerseWithParallel>> {
        let short_name = short_name.to_string();
        self.run(move |db| db.read_verses_with_parallel(&short_name, &parallel, book_index, chapter_index))
            .await
    }

    pub async fn read_verse_with_parallel(
        &self,
        short_name: &str,
        parallel: Vec<String>,
        verse_index: VerseIndex,
    ) -> Result<Option<VerseWithParallel>> {
        let short_name = short_name.to_string();
        self.run(move |db| db.read_verse_with_parallel(&short_name, &parallel, verse_index))
            .await
    }

    pub async fn search(&self, short_name: &str, query: &str) -> Result<Vec<Verse>> {
        let (short_name, query) = (short_name.to_string(), query.to_string());
        self.run(move |db| db.search(&short_name, &query)).await
    }
}
