/**
 * Downloads Module
 *
 * Fetches translation packages, unpacks them and hands the content to
 * the repository for installation.
 */
pub mod archive;
mod downloader;
mod orchestrator;
mod progress;

pub use archive::read_package;
pub use downloader::{download_package, CancellationFlag};
pub use orchestrator::{DownloadHandle, DownloadOrchestrator};
pub use progress::{DownloadState, ProgressTracker, MAX_TRANSFER_PROGRESS};
