/**
 * Package Downloader
 *
 * Streams a package body to disk with progress reporting and
 * cooperative cancellation. A partial file never survives a failure.
 */
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Notify;

use super::progress::ProgressTracker;
use crate::catalog::PackageStream;
use crate::error::{Error, Result};

/// Shared cancellation flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Write `package` to `dest`, reporting each increase of the percentage.
///
/// `fallback_total` is used when the server announced no length. Returns
/// the number of bytes written. On cancellation or error `dest` is removed.
pub async fn download_package<F>(
    package: PackageStream,
    dest: &Path,
    fallback_total: u64,
    cancel: &CancellationFlag,
    on_progress: F,
) -> Result<u64>
where
    F: Fn(u8) + Send + Sync,
{
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::info!("[Downloader] Start: {:?}", dest);
    let result = write_package(package, dest, fallback_total, cancel, &on_progress).await;
    match &result {
        Ok(bytes) => tracing::info!("[Downloader] Done: {:?} ({} bytes)", dest, bytes),
        Err(Error::Cancelled) => tracing::info!("[Downloader] Cancelled: {:?}", dest),
        Err(e) => tracing::warn!("[Downloader] Failed: {:?}: {}", dest, e),
    }
    if result.is_err() {
        remove_partial(dest).await;
    }
    result
}

async fn write_package<F>(
    package: PackageStream,
    dest: &Path,
    fallback_total: u64,
    cancel: &CancellationFlag,
    on_progress: &F,
) -> Result<u64>
where
    F: Fn(u8) + Send + Sync,
{
    let total = package.content_length.unwrap_or(fallback_total);
    let mut tracker = ProgressTracker::new(total);
    let mut chunks = package.chunks;
    let mut file = tokio::fs::File::create(dest).await?;

    on_progress(0);
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            item = chunks.next() => match item {
                Some(chunk) => chunk?,
                None => break,
            },
        };

        file.write_all(&chunk).await?;
        if let Some(percent) = tracker.advance(chunk.len() as u64) {
            on_progress(percent);
        }
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(tracker.transferred())
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("[Downloader] Cannot remove partial file {:?}: {}", path, e),
    }
}
