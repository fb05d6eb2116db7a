//! Content-deduplicated, append-only record log.
//!
//! [`OrderedStore`] is the backend seam: a set of named append-only lists
//! of byte blobs. [`IngestionStore`] layers exact-match deduplication on
//! one such list.
//!
//! The membership check and the append are two separate backend calls, so
//! deduplication only holds while a single process ingests into a key at
//! a time.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;

/// Default list name for the ingested document stream.
pub const DEFAULT_KEY: &str = "NEWS_XML";

/// Backend holding named, append-only lists of blobs.
#[async_trait]
pub trait OrderedStore: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()>;

    /// Number of blobs in the list at `key` (0 if it does not exist).
    async fn len(&self, key: &str) -> Result<u64>;

    /// Blobs at 0-based positions `start..=end`, clamped to the list.
    ///
    /// Empty when `start > end` or `start` is past the end of the list.
    async fn range(&self, key: &str, start: u64, end: u64) -> Result<Vec<Vec<u8>>>;

    /// Append a blob and return the list's new length.
    async fn append(&self, key: &str, blob: &[u8]) -> Result<u64>;
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    /// Stored as a new record at this 1-based position.
    Appended(u64),
    /// A byte-identical record already exists; nothing was written.
    AlreadyPresent,
}

impl Ingested {
    pub fn position(&self) -> Option<u64> {
        match self {
            Self::Appended(pos) => Some(*pos),
            Self::AlreadyPresent => None,
        }
    }
}

/// One stored document and its 1-based position in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub position: u64,
    pub content: Vec<u8>,
}

/// Deduplicating writer over one list of an [`OrderedStore`].
pub struct IngestionStore<S: OrderedStore> {
    store: Arc<S>,
    key: String,
}

impl<S: OrderedStore> IngestionStore<S> {
    pub fn new(store: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append `content` unless a byte-identical record already exists.
    ///
    /// Reads the whole history and compares linearly; the append is the
    /// last call, so a failure never leaves a partial write behind.
    pub async fn ingest(&self, content: &[u8]) -> Result<Ingested> {
        let len = self.store.len(&self.key).await?;
        if len > 0 {
            let history = self.store.range(&self.key, 0, len - 1).await?;
            if let Some(idx) = history.iter().position(|blob| blob.as_slice() == content) {
                debug!(key = %self.key, position = idx + 1, "duplicate record");
                return Ok(Ingested::AlreadyPresent);
            }
        }

        let position = self.store.append(&self.key, content).await?;
        debug!(key = %self.key, position, bytes = content.len(), "record appended");
        Ok(Ingested::Appended(position))
    }

    /// Number of records in the log.
    pub async fn len(&self) -> Result<u64> {
        self.store.len(&self.key).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Every record in insertion order.
    pub async fn records(&self) -> Result<Vec<Record>> {
        let len = self.store.len(&self.key).await?;
        if len == 0 {
            return Ok(Vec::new());
        }
        let blobs = self.store.range(&self.key, 0, len - 1).await?;
        Ok(blobs
            .into_iter()
            .zip(1..)
            .map(|(content, position)| Record { position, content })
            .collect())
    }
}

/// Clamp an inclusive `start..=end` range to a list of `len` items.
///
/// Returns a half-open index range, empty when nothing overlaps.
pub(crate) fn clamp_range(len: u64, start: u64, end: u64) -> std::ops::Range<usize> {
    if len == 0 || start > end || start >= len {
        return 0..0;
    }
    let end = end.min(len - 1);
    start as usize..end as usize + 1
}
