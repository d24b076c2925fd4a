#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

use lectio::catalog::{CatalogClient, PackageStream, RemoteTranslationInfo};
use lectio::paths::AppDirs;
use lectio::storage::models::BOOK_COUNT;
use lectio::{App, Error, Result};

pub const CHUNK_SIZE: usize = 32;

pub fn remote(short_name: &str, name: &str, language: &str) -> RemoteTranslationInfo {
    RemoteTranslationInfo {
        short_name: short_name.to_string(),
        name: name.to_string(),
        language: language.to_string(),
        size: 0,
    }
}

/// ZIP package with book names and the given chapters.
pub fn build_package(short_name: &str, chapters: &[((i32, i32), Vec<&str>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let book_names: Vec<String> = (0..BOOK_COUNT)
        .map(|i| format!("{} book {}", short_name, i + 1))
        .collect();
    writer
        .start_file(format!("{}/books.json", short_name), FileOptions::default())
        .unwrap();
    writer
        .write_all(serde_json::json!({ "bookNames": book_names }).to_string().as_bytes())
        .unwrap();
    for ((book, chapter), verses) in chapters {
        writer
            .start_file(format!("{}/{}-{}.json", short_name, book, chapter), FileOptions::default())
            .unwrap();
        writer
            .write_all(serde_json::to_string(verses).unwrap().as_bytes())
            .unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn sample_package(short_name: &str) -> Vec<u8> {
    build_package(
        short_name,
        &[
            (
                (0, 0),
                vec![
                    "In the beginning God created the heaven and the earth.",
                    "And the earth was without form, and void.",
                ],
            ),
            ((42, 2), vec!["For God so loved the world"]),
        ],
    )
}

type Hook = Box<dyn FnOnce() + Send>;

/// In-memory catalog source with knobs for latency and failures.
#[derive(Default)]
pub struct FakeCatalogClient {
    pub catalog: Mutex<Vec<RemoteTranslationInfo>>,
    pub packages: Mutex<HashMap<String, Vec<u8>>>,
    pub fetch_count: AtomicUsize,
    pub fail_fetch: AtomicBool,
    pub fetch_delay: Mutex<Duration>,
    /// Delay between package chunks
    pub chunk_delay: Mutex<Duration>,
    /// Runs once, when the next package stream has yielded its last chunk
    pub on_exhausted: Mutex<Option<Hook>>,
}

impl FakeCatalogClient {
    pub fn new(catalog: Vec<RemoteTranslationInfo>) -> Self {
        Self {
            catalog: Mutex::new(catalog),
            ..Default::default()
        }
    }

    pub fn with_package(self, short_name: &str, bytes: Vec<u8>) -> Self {
        self.packages
            .lock()
            .unwrap()
            .insert(short_name.to_string(), bytes);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub fn set_chunk_delay(&self, delay: Duration) {
        *self.chunk_delay.lock().unwrap() = delay;
    }

    pub fn set_on_exhausted(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_exhausted.lock().unwrap() = Some(Box::new(hook));
    }
}

#[async_trait]
impl CatalogClient for FakeCatalogClient {
    async fn fetch_catalog(&self) -> Result<Vec<RemoteTranslationInfo>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::Http(503));
        }
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn open_package(&self, short_name: &str) -> Result<PackageStream> {
        let bytes = self
            .packages
            .lock()
            .unwrap()
            .get(short_name)
            .cloned()
            .ok_or(Error::Http(404))?;
        let delay = *self.chunk_delay.lock().unwrap();
        let on_exhausted = self.on_exhausted.lock().unwrap().take();
        let chunks: Vec<Vec<u8>> = bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let exhausted = futures::stream::once(async move {
            if let Some(hook) = on_exhausted {
                hook();
            }
        })
        .filter_map(|()| async { None::<Result<Vec<u8>>> });
        let stream = futures::stream::iter(chunks)
            .then(move |chunk| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok::<_, Error>(chunk)
            })
            .chain(exhausted);
        Ok(PackageStream {
            content_length: Some(bytes.len() as u64),
            chunks: stream.boxed(),
        })
    }
}

pub async fn create_test_app(client: Arc<FakeCatalogClient>) -> (TempDir, App) {
    let temp_dir = TempDir::new().unwrap();
    let app = open_app(temp_dir.path(), client, Duration::from_secs(3600)).await;
    (temp_dir, app)
}

pub async fn open_app(data_dir: &Path, client: Arc<FakeCatalogClient>, ttl: Duration) -> App {
    App::with_client(AppDirs::new(data_dir), client, ttl)
        .await
        .unwrap()
}

pub fn short_names(translations: &[lectio::storage::TranslationInfo]) -> Vec<String> {
    translations.iter().map(|t| t.short_name.clone()).collect()
}
