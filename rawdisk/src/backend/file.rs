use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::SectorBackend;
use crate::error::{AccessError, Result};

/// Stream-file backend: sector storage inside an ordinary file. The sector
/// count comes from the file's byte length, so a trailing partial sector
/// is not addressable.
pub(crate) struct FileBackend {
    file: File,
    sector_count: u64,
}

impl FileBackend {
    pub(crate) fn open(path: &Path, sector_size: u32) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);

        // Writes reach the file system before they are acknowledged
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_SYNC);
        }

        let file = options.open(path).map_err(|source| AccessError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let length = file
            .metadata()
            .map_err(|source| AccessError::Open {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        Ok(Self {
            file,
            sector_count: length / u64::from(sector_size),
        })
    }
}

impl SectorBackend for FileBackend {
    fn sector_count(&self) -> u64 {
        self.sector_count
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        // Dropping the handle releases it; the standard library surfaces no
        // close failure for plain files
        drop(self.file);
        Ok(())
    }
}
