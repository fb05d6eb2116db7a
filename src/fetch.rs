//! Archive retrieval into scoped temporary files.

use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};
use crate::io::HttpClient;

/// Prefix of every temporary download, so strays are recognisable.
pub const TEMP_PREFIX: &str = "downloaded";

/// A downloaded archive on local disk.
///
/// The file is removed when this value is dropped, whichever way the
/// owning scope is left. [`LocalArchive::remove`] does the same but
/// reports a failed deletion instead of ignoring it.
#[derive(Debug)]
pub struct LocalArchive {
    file: NamedTempFile,
    source: String,
    len: u64,
}

impl LocalArchive {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// URL the archive was downloaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Delete the local copy now.
    pub fn remove(self) -> Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.close().map_err(|e| Error::io(path, e))
    }
}

/// Downloads archives into a temporary directory.
pub struct ArchiveFetcher<'a> {
    http: &'a HttpClient,
    temp_dir: PathBuf,
}

impl<'a> ArchiveFetcher<'a> {
    pub fn new(http: &'a HttpClient, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            temp_dir: temp_dir.into(),
        }
    }

    /// Download `url` in full into a fresh, uniquely named temporary file.
    ///
    /// On any failure the partially written file is already gone when this
    /// returns.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<LocalArchive> {
        let file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".zip")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| Error::io(&self.temp_dir, e))?;
        debug!(path = %file.path().display(), "created temporary archive");

        let std_file = file.reopen().map_err(|e| Error::io(file.path(), e))?;
        let mut sink = tokio::fs::File::from_std(std_file);
        let len = self.http.download_to(url, &mut sink, file.path()).await?;
        drop(sink);

        info!(bytes = len, "archive downloaded");
        Ok(LocalArchive {
            file,
            source: url.to_string(),
            len,
        })
    }
}
