use std::io;
use std::path::Path;

use crate::error::Result;

#[cfg(target_os = "linux")]
mod disk;
mod file;

/// A backend owns the live OS resource behind an open session and performs
/// the raw positioned transfers. The session layer on top handles all
/// validation, so implementations only translate between the contract
/// below and the platform calls.
///
/// Transfers are single-shot: a backend issues exactly one platform call
/// and reports however many bytes the platform moved. Short transfers are
/// the session's problem to reject, never retried here.
pub(crate) trait SectorBackend {
    /// Total number of addressable sectors, fixed at open time
    fn sector_count(&self) -> u64;

    /// Repositions the resource cursor to an absolute byte offset
    fn seek(&mut self, offset: u64) -> io::Result<()>;

    /// Reads at the current cursor, returning the bytes transferred
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes at the current cursor, returning the bytes transferred
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Forces written data down to the device
    fn flush(&mut self) -> io::Result<()>;

    /// Releases the OS resource, reporting platform close failures
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Classifies `path` and acquires the matching backend: a path naming a
/// block device gets the handle-based device backend, everything else is
/// treated as an ordinary file. Classification happens before the resource
/// is acquired, and a failure anywhere leaves nothing open.
pub(crate) fn open_backend(path: &Path, sector_size: u32) -> Result<Box<dyn SectorBackend>> {
    #[cfg(target_os = "linux")]
    if is_block_device(path) {
        return Ok(Box::new(disk::DiskBackend::open(path, sector_size)?));
    }

    Ok(Box::new(file::FileBackend::open(path, sector_size)?))
}

#[cfg(target_os = "linux")]
fn is_block_device(path: &Path) -> bool {
    use std::os::unix::fs::FileTypeExt;

    std::fs::metadata(path).is_ok_and(|m| m.file_type().is_block_device())
}
