//! Error types for the ingestion pipeline.
//!
//! Every failure the library can produce falls into one of four kinds:
//! transport, archive format, local filesystem, or store. The binary wraps
//! these with `anyhow` at the top level.

use std::path::PathBuf;

/// Error raised by any pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network/HTTP failure while discovering or downloading.
    #[error("fetch error: {url}: {message}")]
    Fetch { url: String, message: String },

    /// The archive container is unreadable, truncated or corrupt.
    #[error("format error: {0}")]
    Format(String),

    /// Local filesystem failure.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The backing ordered store is unavailable or a call failed.
    #[error("store error: {0}")]
    Store(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Fetch,
    Format,
    Io,
    Store,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn fetch(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Wrap a `std::io::Error` with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::Format(_) => ErrorKind::Format,
            Self::Io { .. } => ErrorKind::Io,
            Self::Store(_) => ErrorKind::Store,
        }
    }
}
