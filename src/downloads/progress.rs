/**
 * Progress Reporting Module
 *
 * State of a single download-and-install operation.
 */
use serde::{Deserialize, Serialize};

/// Highest percentage reported while bytes are still arriving.
pub const MAX_TRANSFER_PROGRESS: u8 = 99;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadState {
    /// Not started yet
    Idle,
    /// Transferring the package, 0..=99
    Downloading { progress: u8 },
    /// Unpacking and writing to the store; cannot be cancelled
    Installing,
    /// Installed and marked as downloaded
    Done,
    /// Failed with error
    Failed(String),
    /// Cancelled by user before installation started
    Cancelled,
}

impl DownloadState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadState::Done | DownloadState::Failed(_) | DownloadState::Cancelled
        )
    }

    /// Percentage in [0, 100]; `None` when there is nothing to show.
    pub fn progress(&self) -> Option<u8> {
        match self {
            DownloadState::Idle => Some(0),
            DownloadState::Downloading { progress } => Some(*progress),
            DownloadState::Installing | DownloadState::Done => Some(100),
            DownloadState::Failed(_) | DownloadState::Cancelled => None,
        }
    }
}

/// Turns byte counts into a non-decreasing percentage.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    transferred: u64,
    reported: u8,
}

impl ProgressTracker {
    /// `total` of 0 means unknown; progress then stays at 0 until the end.
    pub fn new(total: u64) -> Self {
        Self {
            total,
            transferred: 0,
            reported: 0,
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn current(&self) -> u8 {
        self.reported
    }

    /// Account for `bytes` more; returns the new percentage if it went up.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.transferred = self.transferred.saturating_add(bytes);
        if self.total == 0 {
            return None;
        }
        let percent = (self.transferred.saturating_mul(100) / self.total)
            .min(MAX_TRANSFER_PROGRESS as u64) as u8;
        if percent > self.reported {
            self.reported = percent;
            Some(percent)
        } else {
            None
        }
    }
}
