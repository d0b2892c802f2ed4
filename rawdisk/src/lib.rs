//! Sector-addressable access to raw block devices and disk image files.
//!
//! A [`RawDisk`] session binds to one device or file, exposes its capacity
//! as a number of whole sectors of a caller-chosen size, and moves sectors
//! verbatim with positioned, write-through reads and writes. Storage
//! engines built on top never see whether the bytes live on a raw device
//! or in an ordinary file.

mod backend;
mod error;
mod session;

pub use error::{AccessError, Result};
pub use session::{AccessMode, RawDisk};
