//! In-memory store backend.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{OrderedStore, clamp_range};
use crate::error::Result;

/// Process-local [`OrderedStore`].
///
/// Lists live in a `HashMap` behind a [`RwLock`] and vanish with the value.
/// Used by tests and by embedders that only need dedup within one run.
#[derive(Default)]
pub struct MemoryStore {
    lists: RwLock<HashMap<String, Vec<Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with `blobs` already appended to `key`.
    pub fn with_list<B: Into<Vec<u8>>>(key: &str, blobs: impl IntoIterator<Item = B>) -> Self {
        let list = blobs.into_iter().map(Into::into).collect();
        Self {
            lists: RwLock::new(HashMap::from([(key.to_string(), list)])),
        }
    }
}

#[async_trait]
impl OrderedStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn len(&self, key: &str) -> Result<u64> {
        let lists = self.lists.read().await;
        Ok(lists.get(key).map_or(0, |l| l.len() as u64))
    }

    async fn range(&self, key: &str, start: u64, end: u64) -> Result<Vec<Vec<u8>>> {
        let lists = self.lists.read().await;
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        Ok(list[clamp_range(list.len() as u64, start, end)].to_vec())
    }

    async fn append(&self, key: &str, blob: &[u8]) -> Result<u64> {
        let mut lists = self.lists.write().await;
        let list = lists.entry(key.to_string()).or_default();
        list.push(blob.to_vec());
        Ok(list.len() as u64)
    }
}
