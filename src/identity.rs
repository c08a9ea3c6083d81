//! Canonical device identity derived from handle metadata.

use std::fs::File;
use std::os::fd::AsFd;
use std::os::unix::fs::MetadataExt;

use snafu::ResultExt;

use crate::error::{HandleSnafu, Result};

/// Canonical identity of the device behind a handle.
///
/// Derived from the handle's OS metadata rather than from the handle value:
/// fd values are per-process and reused after close, while the
/// `(dev, ino, rdev)` triple identifies the device node itself. Two handles
/// referring to the same device resolve to equal identities, which is what
/// makes deduplication in the registry correct and not just a cache
/// optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    dev: u64,
    ino: u64,
    rdev: u64,
}

impl DeviceIdentity {
    /// Resolve the identity of the device behind `fd`.
    ///
    /// Fails with [`Error::Handle`](crate::Error::Handle) if the metadata
    /// query fails (stale or invalid fd).
    pub fn resolve(fd: impl AsFd) -> Result<Self> {
        // std exposes fstat only through File, so stat a short-lived dup
        // instead of taking ownership of the caller's fd.
        let dup = fd.as_fd().try_clone_to_owned().context(HandleSnafu)?;
        let meta = File::from(dup).metadata().context(HandleSnafu)?;
        Ok(Self { dev: meta.dev(), ino: meta.ino(), rdev: meta.rdev() })
    }

    /// Build an identity from raw metadata values (for tests and
    /// diagnostics).
    pub fn from_raw(dev: u64, ino: u64, rdev: u64) -> Self {
        Self { dev, ino, rdev }
    }
}
