use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::ReadAt;
use crate::error::{Error, Result};

/// Local file reader with random access support
pub struct LocalFileReader {
    file: File,
    path: PathBuf,
    size: u64,
}

impl LocalFileReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let size = file.metadata().map_err(|e| Error::io(path, e))?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            size,
        })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset.checked_add(buf.len() as u64);
        if end.is_none_or(|end| end > self.size) {
            return Err(Error::format(format!(
                "read of {} bytes at offset {offset} runs past end of {} ({} bytes)",
                buf.len(),
                self.path.display(),
                self.size
            )));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file
                .read_exact_at(buf, offset)
                .map_err(|e| Error::io(&self.path, e))
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut filled = 0;
            while filled < buf.len() {
                let n = self
                    .file
                    .seek_read(&mut buf[filled..], offset + filled as u64)
                    .map_err(|e| Error::io(&self.path, e))?;
                if n == 0 {
                    return Err(Error::io(
                        &self.path,
                        std::io::ErrorKind::UnexpectedEof.into(),
                    ));
                }
                filled += n;
            }
            Ok(())
        }

        #[cfg(not(any(unix, windows)))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = &self.file;
            file.seek(SeekFrom::Start(offset))
                .and_then(|_| file.read_exact(buf))
                .map_err(|e| Error::io(&self.path, e))
        }
    }

    fn size(&self) -> u64 {
        self.size
    }
}
