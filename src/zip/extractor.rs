use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::{LocalFileReader, ReadAt};

use super::parser::ZipParser;
use super::structures::{ArchiveEntry, CompressionMethod};

/// Upper bound on the buffer reserved ahead of inflating one entry.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Member-level access to one opened archive.
///
/// The extractor owns the archive's file handle; dropping it releases the
/// handle exactly once.
pub struct ArchiveExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl ArchiveExtractor<LocalFileReader> {
    /// Open a local archive file for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let reader = LocalFileReader::open(path)?;
        Ok(Self::new(Arc::new(reader)))
    }
}

impl<R: ReadAt> ArchiveExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List every entry in the container's directory order.
    ///
    /// The order is fixed by the archive itself, so repeated calls on the
    /// same file agree.
    pub async fn entries(&self) -> Result<Vec<ArchiveEntry>> {
        self.parser.list_entries().await
    }

    /// Read and decompress one entry fully into memory.
    ///
    /// The result is checked against the sizes and CRC-32 recorded in the
    /// central directory.
    pub async fn read_all(&self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        if let CompressionMethod::Unknown(method) = entry.compression_method {
            return Err(Error::format(format!(
                "{}: unsupported compression method {method}",
                entry.name
            )));
        }

        // Bound the declared size by the file before allocating for it.
        let data_offset = self.parser.get_data_offset(entry).await?;
        let size = self.parser.reader().size();
        let in_bounds = data_offset
            .checked_add(entry.compressed_size)
            .is_some_and(|end| end <= size);
        if !in_bounds {
            return Err(Error::format(format!(
                "{}: {} compressed bytes at offset {data_offset} exceed archive size {size}",
                entry.name, entry.compressed_size
            )));
        }

        let mut raw = vec![0u8; usize_of(entry.compressed_size, &entry.name)?];
        self.parser.reader().read_at(data_offset, &mut raw).await?;

        let data = match entry.compression_method {
            CompressionMethod::Deflate => {
                // One byte past the declared size is enough to detect an overrun.
                let limit = entry.uncompressed_size.saturating_add(1);
                let mut out = Vec::with_capacity(entry.uncompressed_size.min(MAX_PREALLOC) as usize);
                DeflateDecoder::new(raw.as_slice())
                    .take(limit)
                    .read_to_end(&mut out)
                    .map_err(|e| {
                        Error::format(format!("{}: corrupt deflate stream: {e}", entry.name))
                    })?;
                if out.len() as u64 > entry.uncompressed_size {
                    return Err(Error::format(format!(
                        "{}: inflates past declared size of {} bytes",
                        entry.name, entry.uncompressed_size
                    )));
                }
                out
            }
            _ => raw,
        };

        if data.len() as u64 != entry.uncompressed_size {
            return Err(Error::format(format!(
                "{}: expected {} bytes, got {}",
                entry.name,
                entry.uncompressed_size,
                data.len()
            )));
        }

        let crc = crc32fast::hash(&data);
        if crc != entry.crc32 {
            return Err(Error::format(format!(
                "{}: CRC-32 mismatch (expected {:08x}, got {crc:08x})",
                entry.name, entry.crc32
            )));
        }

        Ok(data)
    }
}

fn usize_of(size: u64, name: &str) -> Result<usize> {
    usize::try_from(size)
        .map_err(|_| Error::format(format!("{name}: entry of {size} bytes is too large")))
}
