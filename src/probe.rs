//! Device probing: open a device context and find a pipeline-capable core.
//!
//! A single device node may expose several compute cores, not all of which
//! can drive the rendering pipeline. Screen construction therefore walks the
//! cores by index until one advertises [`PIPE_CAP_BIT`] and hands that core,
//! together with the device context, to the driver's screen constructor.

use std::fs::OpenOptions;
use std::os::fd::OwnedFd;

use snafu::ResultExt;

use crate::error::{CapabilityNotFoundSnafu, DeviceOpenSnafu, Result};
use crate::registry::Screen;

/// Feature bit a core must advertise to drive the rendering pipeline.
pub const PIPE_CAP_BIT: u64 = 1 << 2;

/// Render node probed when the caller does not supply a handle.
pub const DEFAULT_RENDER_NODE: &str = "/dev/dri/renderD128";

/// Narrow interface to the device family behind the registry.
///
/// Implementations wrap the real device protocol: context open, core
/// enumeration, capability query, and screen construction. Any platform
/// hint the screen constructor needs (a scanout wrapper, tiling
/// configuration) is state of the implementation itself, not a parameter of
/// this interface.
pub trait Driver: Send + Sync {
    /// Device context bound to one open fd.
    type Device;
    /// One compute core exposed by a device context.
    type Core;
    /// The screen type this driver constructs.
    type Screen: Screen;

    /// Open a device context over `fd`. The context owns the fd from here
    /// on, whether or not the open succeeds.
    fn open_device(&self, fd: OwnedFd) -> Result<Self::Device>;

    /// Open the core at `index`, or `None` once enumeration is exhausted.
    fn open_core(&self, device: &Self::Device, index: u32) -> Option<Self::Core>;

    /// Query the capability bitmask of a core.
    fn core_flags(&self, core: &Self::Core) -> Result<u64>;

    /// Release a probed core that will not be used.
    fn close_core(&self, core: Self::Core);

    /// Build the screen from a device context and a capable core.
    fn create_screen(&self, device: Self::Device, core: Self::Core) -> Result<Self::Screen>;
}

/// Build a screen over `fd`.
///
/// Probes cores from index 0 upward and hands the first one advertising
/// [`PIPE_CAP_BIT`] to the driver's screen constructor. Cores that do not
/// match, or whose capability query fails, are released before the next
/// index is tried. Running out of cores before a match is
/// [`Error::CapabilityNotFound`](crate::Error::CapabilityNotFound).
pub fn create_screen_from_fd<D: Driver>(driver: &D, fd: OwnedFd) -> Result<D::Screen> {
    let device = driver
        .open_device(fd)
        .inspect_err(|error| tracing::error!(%error, "failed to open device context"))?;

    let mut probed = 0u32;
    let core = loop {
        let index = probed;
        let Some(core) = driver.open_core(&device, index) else {
            tracing::error!(probed, "no pipeline-capable core on device");
            return CapabilityNotFoundSnafu { probed }.fail();
        };
        probed += 1;

        match driver.core_flags(&core) {
            Ok(flags) if flags & PIPE_CAP_BIT != 0 => {
                tracing::debug!(index, flags, "found pipeline-capable core");
                break core;
            }
            Ok(flags) => tracing::debug!(index, flags, "core lacks pipeline capability"),
            Err(error) => tracing::debug!(index, %error, "capability query failed, skipping core"),
        }
        driver.close_core(core);
    };

    driver
        .create_screen(device, core)
        .inspect_err(|error| tracing::error!(%error, "screen constructor failed"))
}

/// Build a screen over the default render node.
///
/// Failure to open the node is an ordinary
/// [`Error::DeviceOpen`](crate::Error::DeviceOpen), not a separate path.
pub fn create_screen_default<D: Driver>(driver: &D) -> Result<D::Screen> {
    let fd = open_default_node()?;
    create_screen_from_fd(driver, fd)
}

pub(crate) fn open_default_node() -> Result<OwnedFd> {
    // std sets O_CLOEXEC on open.
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(DEFAULT_RENDER_NODE)
        .context(DeviceOpenSnafu { device: DEFAULT_RENDER_NODE })?;
    Ok(OwnedFd::from(file))
}
