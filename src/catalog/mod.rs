/**
 * Catalog Module
 *
 * Remote source of the translation list and of translation packages.
 */
mod client;

pub use client::HttpCatalogClient;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::TranslationInfo;

/// One entry of the remote `list.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTranslationInfo {
    pub short_name: String,
    pub name: String,
    pub language: String,
    pub size: i64,
}

impl RemoteTranslationInfo {
    pub fn into_translation_info(self, downloaded: bool) -> TranslationInfo {
        TranslationInfo {
            short_name: self.short_name,
            name: self.name,
            language: self.language,
            size: self.size,
            downloaded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCatalog {
    pub translations: Vec<RemoteTranslationInfo>,
}

/// A package body being received, chunk by chunk.
pub struct PackageStream {
    /// Length announced by the server, if any
    pub content_length: Option<u64>,
    pub chunks: BoxStream<'static, Result<Vec<u8>>>,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch the list of translations offered by the remote source.
    async fn fetch_catalog(&self) -> Result<Vec<RemoteTranslationInfo>>;

    /// Start receiving the package of one translation.
    async fn open_package(&self, short_name: &str) -> Result<PackageStream>;
}
