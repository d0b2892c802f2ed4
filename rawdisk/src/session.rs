use std::io;
use std::path::Path;

use crate::backend::{self, SectorBackend};
use crate::error::{AccessError, Result};

bitflags::bitflags! {
    /// Per-session behavior switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessMode: u32 {
        /// Force a durability flush after every completed write, on top of
        /// the write-through flags the resource is opened with
        const FLUSH_EVERY_WRITE = 0b00000001;
        /// Skip repositioning when a read continues exactly where the
        /// previous access left the cursor. Purely a latency optimization
        /// over sequential scans; the bytes returned never differ.
        const SEQUENTIAL_HINT = 0b00000010;
    }
}

/// A session against one sector-addressable resource: a raw block device
/// or an ordinary file. The sector size is fixed for the session's
/// lifetime; the sector count is discovered when the resource is opened.
/// All I/O moves exactly one whole sector, addressed by index.
///
/// Sessions are not internally synchronized. Every operation takes
/// `&mut self`, so concurrent use of one session does not compile; callers
/// wanting parallel access open independent sessions.
pub struct RawDisk {
    sector_size: u32,
    mode: AccessMode,
    state: Option<OpenState>,
}

/// Live state of an open session. Exists exactly while the OS resource is
/// held, so a sector count can never be observed on a closed session.
struct OpenState {
    backend: Box<dyn SectorBackend>,
    sector_count: u64,
    /// Sector index the resource cursor is known to sit on. `None` while a
    /// transfer is in flight or after one failed, which forces the next
    /// read to reposition.
    cursor: Option<u64>,
}

impl RawDisk {
    /// Creates a closed session for `sector_size`-byte sectors with both
    /// mode flags off
    pub fn new(sector_size: u32) -> Self {
        Self::with_mode(sector_size, AccessMode::empty())
    }

    pub fn with_mode(sector_size: u32, mode: AccessMode) -> Self {
        Self {
            sector_size,
            mode,
            state: None,
        }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AccessMode) {
        self.mode = mode;
    }

    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    /// Total addressable sectors; `Some` exactly while the session is open
    pub fn sector_count(&self) -> Option<u64> {
        self.state.as_ref().map(|s| s.sector_count)
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Acquires the resource behind `path` for read/write access with
    /// write-through semantics and discovers its sector count. A path
    /// naming a block device is sized from the device geometry and
    /// requires the session's sector size to be an exact multiple of the
    /// device's native sector size; any other path is sized from its byte
    /// length, where a trailing partial sector is silently inaccessible.
    ///
    /// On any failure the session remains closed; in particular a geometry
    /// failure releases the just-acquired resource before reporting.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if self.state.is_some() {
            return Err(AccessError::AlreadyOpen);
        }

        if self.sector_size == 0 {
            return Err(AccessError::Configuration { sector_size: 0 });
        }

        if path.as_os_str().is_empty() {
            return Err(AccessError::Open {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "empty path"),
            });
        }

        let backend = backend::open_backend(path, self.sector_size)?;
        let sector_count = backend.sector_count();

        self.state = Some(OpenState {
            backend,
            sector_count,
            // A freshly acquired resource has its cursor at byte 0
            cursor: Some(0),
        });

        Ok(())
    }

    /// Releases the resource. The session is closed afterwards even when
    /// the platform reports a close failure; the old handle is never
    /// reused.
    pub fn close(&mut self) -> Result<()> {
        let state = self.state.take().ok_or(AccessError::NotOpen)?;
        state.backend.close().map_err(AccessError::Close)
    }

    /// Fills `buf` with the contents of the given sector. The buffer must
    /// be exactly one sector long and the index must lie inside the device
    /// area; both are checked before the resource is touched. Either the
    /// full sector is transferred or an error is reported.
    ///
    /// With [`AccessMode::SEQUENTIAL_HINT`] set, a read that continues
    /// exactly where the cursor already sits skips the reposition step.
    pub fn read(&mut self, buf: &mut [u8], sector: i64) -> Result<()> {
        let sector_size = self.sector_size;
        let hint = self.mode.contains(AccessMode::SEQUENTIAL_HINT);
        let state = self.state.as_mut().ok_or(AccessError::NotOpen)?;

        validate(buf.len(), sector, sector_size, state.sector_count)?;
        let index = sector as u64;

        let must_seek = !(hint && state.cursor == Some(index));

        // Unknown until the transfer lands; a failure partway leaves the
        // cursor wherever the platform left it
        state.cursor = None;

        if must_seek {
            state
                .backend
                .seek(index * u64::from(sector_size))
                .map_err(|source| AccessError::Seek { sector, source })?;
        }

        let n = state
            .backend
            .read(buf)
            .map_err(|source| AccessError::Read { sector, source })?;
        if n != sector_size as usize {
            return Err(AccessError::Read {
                sector,
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "short read"),
            });
        }

        state.cursor = Some(index + 1);
        Ok(())
    }

    /// Writes `buf` to the given sector. Validation mirrors [`read`]:
    /// whole-sector buffer, in-bounds index, nothing touched otherwise.
    /// Writes always reposition; only reads take the sequential fast path.
    ///
    /// With [`AccessMode::FLUSH_EVERY_WRITE`] set, a completed write is
    /// followed by a durability flush of the resource.
    ///
    /// [`read`]: RawDisk::read
    pub fn write(&mut self, buf: &[u8], sector: i64) -> Result<()> {
        let sector_size = self.sector_size;
        let flush = self.mode.contains(AccessMode::FLUSH_EVERY_WRITE);
        let state = self.state.as_mut().ok_or(AccessError::NotOpen)?;

        validate(buf.len(), sector, sector_size, state.sector_count)?;
        let index = sector as u64;

        state.cursor = None;

        state
            .backend
            .seek(index * u64::from(sector_size))
            .map_err(|source| AccessError::Seek { sector, source })?;

        let n = state
            .backend
            .write(buf)
            .map_err(|source| AccessError::Write { sector, source })?;
        if n != sector_size as usize {
            return Err(AccessError::Write {
                sector,
                source: io::Error::new(io::ErrorKind::WriteZero, "short write"),
            });
        }

        state.cursor = Some(index + 1);

        if flush {
            state.backend.flush().map_err(AccessError::Flush)?;
        }

        Ok(())
    }
}

/// Shared preconditions for both transfer directions: whole-sector buffer
/// first, then bounds. Runs before any positioning or I/O, so a rejected
/// call never touches the resource.
fn validate(buf_len: usize, sector: i64, sector_size: u32, sector_count: u64) -> Result<()> {
    if buf_len != sector_size as usize {
        return Err(AccessError::SizeMismatch {
            expected: sector_size,
            actual: buf_len,
        });
    }

    if sector < 0 || sector as u64 >= sector_count {
        return Err(AccessError::OutOfRange {
            sector,
            sector_count,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_length_is_checked_before_bounds() {
        // Both preconditions violated: the buffer complaint wins
        let err = validate(100, -1, 512, 8).unwrap_err();
        assert!(matches!(err, AccessError::SizeMismatch { .. }));
    }

    #[test]
    fn negative_sector_is_out_of_range() {
        let err = validate(512, -1, 512, 8).unwrap_err();
        assert!(matches!(
            err,
            AccessError::OutOfRange {
                sector: -1,
                sector_count: 8
            }
        ));
    }

    #[test]
    fn upper_bound_is_exclusive() {
        assert!(validate(512, 7, 512, 8).is_ok());

        let err = validate(512, 8, 512, 8).unwrap_err();
        assert!(matches!(err, AccessError::OutOfRange { sector: 8, .. }));
    }

    #[test]
    fn whole_sector_buffers_pass() {
        assert!(validate(512, 0, 512, 1).is_ok());

        assert!(matches!(
            validate(511, 0, 512, 1).unwrap_err(),
            AccessError::SizeMismatch {
                expected: 512,
                actual: 511
            }
        ));
        assert!(matches!(
            validate(513, 0, 512, 1).unwrap_err(),
            AccessError::SizeMismatch { .. }
        ));
    }
}
