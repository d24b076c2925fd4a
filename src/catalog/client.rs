use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;

use super::{CatalogClient, PackageStream, RemoteCatalog, RemoteTranslationInfo};
use crate::error::{Error, Result};
use crate::storage::validate_short_name;

/// Catalog served over HTTP(S):
/// - `{base_url}/list.json`
/// - `{base_url}/translations/{shortName}.zip`
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn catalog_url(&self) -> String {
        format!("{}/list.json", self.base_url)
    }

    pub fn package_url(&self, short_name: &str) -> String {
        format!("{}/translations/{}.zip", self.base_url, short_name)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch_catalog(&self) -> Result<Vec<RemoteTranslationInfo>> {
        let url = self.catalog_url();
        tracing::debug!("[Catalog] GET {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Http(response.status().as_u16()));
        }

        let catalog: RemoteCatalog = response.json().await.map_err(|e| {
            if e.is_decode() {
                Error::Package(format!("invalid catalog: {}", e))
            } else {
                Error::from(e)
            }
        })?;
        tracing::info!("[Catalog] Fetched {} translations", catalog.translations.len());
        Ok(catalog.translations)
    }

    async fn open_package(&self, short_name: &str) -> Result<PackageStream> {
        let url = self.package_url(validate_short_name(short_name)?);
        tracing::debug!("[Catalog] GET {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Http(response.status().as_u16()));
        }

        let content_length = response.content_length();
        let chunks = response
            .bytes_stream()
            .map(|item| item.map(|bytes| bytes.to_vec()).map_err(Error::from))
            .boxed();
        Ok(PackageStream {
            content_length,
            chunks,
        })
    }
}
