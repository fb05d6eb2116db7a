//! Byte sources: blocking-style HTTP transport and random-access local files.

mod http;
mod local;

pub use http::{HttpClient, Page};
pub use local::LocalFileReader;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Reads past the end of the source fail with a format error, since the
    /// only callers are container parsers following offsets they were given.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}
