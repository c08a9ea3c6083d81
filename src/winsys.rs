//! Registry-backed acquisition entry points.
//!
//! These tie the pieces together: resolve the canonical identity of the
//! device behind a handle, then acquire the shared screen for it from the
//! registry, constructing the screen through the probing helper on a miss.

use std::os::fd::BorrowedFd;
use std::sync::Arc;

use snafu::ResultExt;

use crate::error::{HandleSnafu, Result};
use crate::identity::DeviceIdentity;
use crate::probe::{self, Driver};
use crate::registry::{Screen, ScreenRegistry, SharedScreen, registry};

impl ScreenRegistry {
    /// Acquire the shared screen for the device behind `fd` against this
    /// registry. See [`acquire_shared`].
    pub fn acquire_shared<D: Driver>(&self, driver: &D, fd: BorrowedFd<'_>) -> Result<SharedScreen<'_>> {
        let identity = DeviceIdentity::resolve(fd)?;
        self.acquire(identity, || {
            // The registry owns its own dup of the fd, so the caller's fd
            // can be closed independently of the screen's lifetime.
            let dup = fd.try_clone_to_owned().context(HandleSnafu)?;
            let screen = probe::create_screen_from_fd(driver, dup)?;
            Ok(Arc::new(screen) as Arc<dyn Screen>)
        })
    }

    /// Acquire the shared screen for the default render node against this
    /// registry. See [`acquire_default`].
    pub fn acquire_default<D: Driver>(&self, driver: &D) -> Result<SharedScreen<'_>> {
        let node = probe::open_default_node()?;
        let identity = DeviceIdentity::resolve(&node)?;
        // On a hit the closure never runs and the node fd just closes.
        self.acquire(identity, || {
            let screen = probe::create_screen_from_fd(driver, node)?;
            Ok(Arc::new(screen) as Arc<dyn Screen>)
        })
    }
}

/// Acquire the shared screen for the device behind `fd`.
///
/// The registry key is the device's canonical identity, so handles obtained
/// through dup, re-open, or inheritance all share one screen and the screen
/// is constructed at most once per device. The caller's fd can be closed the
/// moment this returns.
pub fn acquire_shared<D: Driver>(driver: &D, fd: BorrowedFd<'_>) -> Result<SharedScreen<'static>> {
    registry().acquire_shared(driver, fd)
}

/// Acquire the shared screen for the default render node.
///
/// The node's identity is resolved before acquiring, so default-node
/// acquirers share a screen with fd acquirers of the same device.
pub fn acquire_default<D: Driver>(driver: &D) -> Result<SharedScreen<'static>> {
    registry().acquire_default(driver)
}
