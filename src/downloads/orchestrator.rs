use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use super::archive::read_package;
use super::downloader::{download_package, CancellationFlag};
use super::progress::DownloadState;
use crate::error::{Error, Result};
use crate::observable::{Observable, Subscription};
use crate::storage::{validate_short_name, TranslationInfo};
use crate::translations::TranslationRepository;

/// Runs one download-and-install at a time.
#[derive(Clone)]
pub struct DownloadOrchestrator {
    repository: TranslationRepository,
    downloads_dir: PathBuf,
    active: Arc<AtomicBool>,
}

/// A running download. Dropping the handle does not stop the work.
pub struct DownloadHandle {
    short_name: String,
    state: Observable<DownloadState>,
    cancel: CancellationFlag,
    task: JoinHandle<Result<TranslationInfo>>,
}

struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl DownloadOrchestrator {
    pub fn new(repository: TranslationRepository, downloads_dir: PathBuf) -> Self {
        Self {
            repository,
            downloads_dir,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start downloading `translation`. Returns `None` while another
    /// download is still running.
    pub fn download(&self, translation: TranslationInfo) -> Option<DownloadHandle> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(
                "[Orchestrator] Download already active, ignoring {}",
                translation.short_name
            );
            return None;
        }
        let guard = ActiveGuard(self.active.clone());

        let state = Observable::new(DownloadState::Idle);
        let cancel = CancellationFlag::new();
        let short_name = translation.short_name.clone();

        let job = DownloadJob {
            repository: self.repository.clone(),
            temp_file: self.downloads_dir.join(format!("{}.zip.part", short_name)),
            state: state.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(async move {
            let _guard = guard;
            job.run(translation).await
        });

        Some(DownloadHandle {
            short_name,
            state,
            cancel,
            task,
        })
    }
}

impl DownloadHandle {
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn state(&self) -> DownloadState {
        self.state.get()
    }

    pub fn subscribe(&self) -> Subscription<DownloadState> {
        self.state.subscribe()
    }

    /// Has no effect once installation has started.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(self) -> Result<TranslationInfo> {
        self.task.await?
    }
}

struct DownloadJob {
    repository: TranslationRepository,
    temp_file: PathBuf,
    state: Observable<DownloadState>,
    cancel: CancellationFlag,
}

impl DownloadJob {
    async fn run(self, translation: TranslationInfo) -> Result<TranslationInfo> {
        tracing::info!("[Orchestrator] Downloading {}", translation.short_name);
        let result = self.download_and_install(&translation).await;
        remove_temp_file(&self.temp_file).await;

        match &result {
            Ok(_) => {
                tracing::info!("[Orchestrator] {} installed", translation.short_name);
                self.state.set(DownloadState::Done);
            }
            Err(Error::Cancelled) => {
                tracing::info!("[Orchestrator] {} cancelled", translation.short_name);
                self.state.set(DownloadState::Cancelled);
            }
            Err(e) => {
                tracing::error!("[Orchestrator] {} failed: {}", translation.short_name, e);
                self.state.set(DownloadState::Failed(e.to_string()));
            }
        }
        result
    }

    async fn download_and_install(&self, translation: &TranslationInfo) -> Result<TranslationInfo> {
        validate_short_name(&translation.short_name)?;
        self.state.set(DownloadState::Downloading { progress: 0 });

        let package = self
            .repository
            .client()
            .open_package(&translation.short_name)
            .await?;
        let state = self.state.clone();
        download_package(
            package,
            &self.temp_file,
            translation.size.max(0) as u64,
            &self.cancel,
            move |progress| {
                state.update(|current| match current {
                    DownloadState::Downloading { progress: previous } if *previous >= progress => false,
                    _ => {
                        *current = DownloadState::Downloading { progress };
                        true
                    }
                });
            },
        )
        .await?;

        // Last point where cancellation is honoured.
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.state.set(DownloadState::Installing);

        let path = self.temp_file.clone();
        let content = tokio::task::spawn_blocking(move || read_package(&path)).await??;
        self.repository
            .install_translation(translation, content)
            .await
    }
}

async fn remove_temp_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("[Orchestrator] Cannot remove {:?}: {}", path, e);
        }
    }
}
