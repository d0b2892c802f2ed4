use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use scopeguard::ScopeGuard;

use super::SectorBackend;
use crate::error::{AccessError, Result};

/// Handle-based device backend: a raw descriptor on a block device, with
/// geometry taken from the block layer instead of file metadata. The
/// configured sector size must be an exact multiple of the device's native
/// sector size.
pub(crate) struct DiskBackend {
    fd: libc::c_int,
    sector_count: u64,
}

impl DiskBackend {
    pub(crate) fn open(path: &Path, sector_size: u32) -> Result<Self> {
        let open_error = |source| AccessError::Open {
            path: path.to_path_buf(),
            source,
        };

        let pathname = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| open_error(io::Error::new(io::ErrorKind::InvalidInput, "nul in path")))?;

        // Read/write with write-through semantics
        let fd = unsafe {
            libc::open(
                pathname.as_ptr(),
                libc::O_RDWR | libc::O_SYNC | libc::O_CLOEXEC,
            )
        };
        if fd < 0 {
            return Err(open_error(io::Error::last_os_error()));
        }

        // A geometry failure must release the descriptor before reporting
        let guard = scopeguard::guard(fd, |fd| unsafe {
            libc::close(fd);
        });

        let native = native_sector_size(*guard).map_err(open_error)?;
        if sector_factor(sector_size, native).is_none() {
            return Err(AccessError::Configuration { sector_size });
        }

        let total_bytes = device_length(*guard).map_err(open_error)?;

        Ok(Self {
            fd: ScopeGuard::into_inner(guard),
            sector_count: total_bytes / u64::from(sector_size),
        })
    }
}

/// Number of native sectors per logical sector, if the logical size is a
/// positive exact multiple of the native size
fn sector_factor(sector_size: u32, native: u32) -> Option<u32> {
    match native {
        0 => None,
        n if sector_size == 0 || sector_size % n != 0 => None,
        n => Some(sector_size / n),
    }
}

/// Native sector size of the block device in bytes
fn native_sector_size(fd: libc::c_int) -> io::Result<u32> {
    let mut size: libc::c_int = 0;
    if unsafe { libc::ioctl(fd, libc::BLKSSZGET, &mut size) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(size as u32)
}

// Not exposed by the `libc` crate; value from linux/fs.h (`_IOR(0x12, 114, size_t)`).
const BLKGETSIZE64: libc::c_ulong = 0x8008_1272;

/// Total byte length of the block device
fn device_length(fd: libc::c_int) -> io::Result<u64> {
    let mut length: u64 = 0;
    if unsafe { libc::ioctl(fd, BLKGETSIZE64, &mut length) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(length)
}

impl SectorBackend for DiskBackend {
    fn sector_count(&self) -> u64 {
        self.sector_count
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        if unsafe { libc::lseek(self.fd, offset as libc::off_t, libc::SEEK_SET) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(self.fd, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        if unsafe { libc::fsync(self.fd) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn close(mut self: Box<Self>) -> io::Result<()> {
        let fd = self.fd;
        // Keep Drop from closing the descriptor a second time
        self.fd = -1;

        if unsafe { libc::close(fd) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for DiskBackend {
    fn drop(&mut self) {
        if self.fd >= 0 {
            unsafe { libc::close(self.fd) };
        }
    }
}
