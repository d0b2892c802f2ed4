use std::{io, path::PathBuf};

/// Alias for operations which fail with [`AccessError`]
pub type Result<T> = core::result::Result<T, AccessError>;

/// Errors reported by a [`RawDisk`](crate::RawDisk) session. Every failing
/// precondition and platform call maps to its own variant; an error ends
/// the operation that raised it but leaves the session usable, except that
/// a failed open always leaves the session closed.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The configured logical sector size cannot be used: it is zero or it
    /// is not an exact multiple of the device's native sector size
    #[error("sector size {sector_size} not allowed")]
    Configuration { sector_size: u32 },

    /// The OS resource behind the path could not be acquired, or its
    /// geometry could not be determined
    #[error("open failed for `{}`", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The session already holds an open resource
    #[error("device already open")]
    AlreadyOpen,

    /// The platform reported a failure while releasing the resource. The
    /// session is closed regardless; the old handle is gone.
    #[error("close failed")]
    Close(#[source] io::Error),

    /// The operation requires an open session
    #[error("device not open")]
    NotOpen,

    /// The caller's buffer is not exactly one sector long
    #[error("buffer length {actual} does not match sector size {expected}")]
    SizeMismatch { expected: u32, actual: usize },

    /// The requested sector index lies outside the device area
    #[error("sector {sector} outside device area ({sector_count} sectors)")]
    OutOfRange { sector: i64, sector_count: u64 },

    /// The resource cursor could not be repositioned
    #[error("seek to sector {sector} failed")]
    Seek {
        sector: i64,
        #[source]
        source: io::Error,
    },

    /// The platform read failed or returned fewer bytes than one sector
    #[error("reading sector {sector} failed")]
    Read {
        sector: i64,
        #[source]
        source: io::Error,
    },

    /// The platform write failed or accepted fewer bytes than one sector
    #[error("writing sector {sector} failed")]
    Write {
        sector: i64,
        #[source]
        source: io::Error,
    },

    /// The durability flush after a write failed
    #[error("flush after write failed")]
    Flush(#[source] io::Error),
}
