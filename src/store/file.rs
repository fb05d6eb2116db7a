//! Durable store backend: one append-only log file per key.
//!
//! File layout: an 8-byte magic, then records of a little-endian `u64`
//! length followed by that many bytes. A record cut short by a crash is
//! dropped (and the file truncated) the next time the key is opened.
//!
//! Log I/O, including the `fsync` after each append, is plain blocking
//! `std::fs` work done on the calling task's thread while the store's mutex
//! is held. Callers drive one store from one task at a time; a caller that
//! shares it across many tasks should expect appends to stall its worker.

use async_trait::async_trait;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{OrderedStore, clamp_range};
use crate::error::{Error, Result};

const MAGIC: &[u8; 8] = b"FPLOG\x00\x00\x01";
const RECORD_HEADER_SIZE: u64 = 8;

/// [`OrderedStore`] persisted under a directory.
pub struct FileStore {
    dir: PathBuf,
    logs: Mutex<HashMap<String, KeyLog>>,
}

/// An opened log file and the (offset, length) of every record in it.
struct KeyLog {
    file: File,
    path: PathBuf,
    index: Vec<(u64, u64)>,
    end: u64,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| store_io(&dir, e))?;
        let store = Self {
            dir,
            logs: Mutex::new(HashMap::new()),
        };
        store.ping().await?;
        Ok(store)
    }

    fn log_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(Error::store(format!("invalid list key {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.log")))
    }

    /// Run `f` against the log for `key`, opening it on first use.
    ///
    /// `f` runs synchronously under the lock and blocks the executor thread.
    async fn with_log<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut KeyLog) -> Result<T>,
    ) -> Result<T> {
        let mut logs = self.logs.lock().await;
        if !logs.contains_key(key) {
            let log = KeyLog::open(self.log_path(key)?)?;
            logs.insert(key.to_string(), log);
        }
        match logs.get_mut(key) {
            Some(log) => f(log),
            None => Err(Error::store(format!("log for {key:?} not loaded"))),
        }
    }
}

#[async_trait]
impl OrderedStore for FileStore {
    async fn ping(&self) -> Result<()> {
        let meta = tokio::fs::metadata(&self.dir)
            .await
            .map_err(|e| store_io(&self.dir, e))?;
        if !meta.is_dir() {
            return Err(Error::store(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        Ok(())
    }

    async fn len(&self, key: &str) -> Result<u64> {
        self.with_log(key, |log| Ok(log.index.len() as u64)).await
    }

    async fn range(&self, key: &str, start: u64, end: u64) -> Result<Vec<Vec<u8>>> {
        self.with_log(key, |log| log.read_range(start, end)).await
    }

    async fn append(&self, key: &str, blob: &[u8]) -> Result<u64> {
        self.with_log(key, |log| log.append(blob)).await
    }
}

impl KeyLog {
    fn open(path: PathBuf) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| store_io(&path, e))?;
        let size = file.metadata().map_err(|e| store_io(&path, e))?.len();

        if size == 0 {
            file.write_all(MAGIC)
                .and_then(|_| file.sync_data())
                .map_err(|e| store_io(&path, e))?;
            debug!(path = %path.display(), "created log");
            return Ok(Self {
                file,
                path,
                index: Vec::new(),
                end: MAGIC.len() as u64,
            });
        }

        let mut magic = [0u8; 8];
        if size < MAGIC.len() as u64
            || file.read_exact(&mut magic).is_err()
            || &magic != MAGIC
        {
            return Err(Error::store(format!(
                "{} is not a record log",
                path.display()
            )));
        }

        let mut index = Vec::new();
        let mut pos = MAGIC.len() as u64;
        while pos + RECORD_HEADER_SIZE <= size {
            file.seek(SeekFrom::Start(pos))
                .map_err(|e| store_io(&path, e))?;
            let len = file
                .read_u64::<LittleEndian>()
                .map_err(|e| store_io(&path, e))?;
            let data = pos + RECORD_HEADER_SIZE;
            if len > size - data {
                break;
            }
            index.push((data, len));
            pos = data + len;
        }

        if pos != size {
            warn!(
                path = %path.display(),
                dropped = size - pos,
                "truncating incomplete trailing record"
            );
            file.set_len(pos).map_err(|e| store_io(&path, e))?;
        }

        debug!(path = %path.display(), records = index.len(), "opened log");
        Ok(Self {
            file,
            path,
            index,
            end: pos,
        })
    }

    fn read_range(&mut self, start: u64, end: u64) -> Result<Vec<Vec<u8>>> {
        let range = clamp_range(self.index.len() as u64, start, end);
        let mut blobs = Vec::with_capacity(range.len());
        for &(offset, len) in &self.index[range] {
            let mut buf = vec![0u8; len as usize];
            self.file
                .seek(SeekFrom::Start(offset))
                .and_then(|_| self.file.read_exact(&mut buf))
                .map_err(|e| store_io(&self.path, e))?;
            blobs.push(buf);
        }
        Ok(blobs)
    }

    fn append(&mut self, blob: &[u8]) -> Result<u64> {
        let mut record = Vec::with_capacity(RECORD_HEADER_SIZE as usize + blob.len());
        record
            .write_u64::<LittleEndian>(blob.len() as u64)
            .map_err(|e| store_io(&self.path, e))?;
        record.extend_from_slice(blob);

        let written = self
            .file
            .seek(SeekFrom::Start(self.end))
            .and_then(|_| self.file.write_all(&record))
            .and_then(|_| self.file.sync_data());
        if let Err(e) = written {
            // Roll back so the next open does not see a torn record.
            let _ = self.file.set_len(self.end);
            return Err(store_io(&self.path, e));
        }

        self.index.push((self.end + RECORD_HEADER_SIZE, blob.len() as u64));
        self.end += record.len() as u64;
        Ok(self.index.len() as u64)
    }
}

fn store_io(path: &Path, e: std::io::Error) -> Error {
    Error::store(format!("{}: {e}", path.display()))
}
