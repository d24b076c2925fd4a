/**
 * Error Module
 *
 * One error type for the whole core. Sources that are not `Clone` are
 * held behind `Arc` so a single reload result can be handed to every
 * caller waiting on it.
 */
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("network request failed: {0}")]
    Network(#[source] Arc<reqwest::Error>),

    #[error("server returned HTTP {0}")]
    Http(u16),

    #[error("storage failure: {0}")]
    Storage(#[source] Arc<rusqlite::Error>),

    #[error("I/O failure: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("malformed translation package: {0}")]
    Package(String),

    #[error("download cancelled")]
    Cancelled,

    #[error("invalid translation short name: {0:?}")]
    InvalidTranslationName(String),

    #[error("unknown translation: {0}")]
    TranslationNotFound(String),

    #[error("translation {0} is not downloaded")]
    NotDownloaded(String),

    #[error("no translation selected")]
    NoTranslationSelected,

    #[error("cannot remove the current translation {0}")]
    RemoveCurrentTranslation(String),

    #[error("invalid verse index {book}:{chapter}:{verse}")]
    InvalidVerseIndex { book: i32, chapter: i32, verse: i32 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Worker(String),
}

impl Error {
    /// Network and HTTP failures may be retried by the caller; everything
    /// else is fatal for the operation in progress.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Http(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Error::Http(status.as_u16()),
            None => Error::Network(Arc::new(e)),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(Arc::new(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Package(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Package(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Worker(e.to_string())
    }
}
