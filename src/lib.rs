//! Process-wide sharing of device-bound screens.
//!
//! A screen is expensive to construct and must exist at most once per
//! physical device, yet callers routinely hold many distinct fds (dup'd,
//! re-opened, inherited) that all refer to the same device. This crate keys
//! a refcounted registry by the canonical identity of the device behind a
//! handle — its `(dev, ino, rdev)` metadata triple — instead of the fd
//! value, so every such handle resolves to the same shared screen.
//!
//! # Acquisition and release
//!
//! [`acquire_shared`] resolves the handle's identity and returns a
//! [`SharedScreen`] guard for the cached screen, constructing it through
//! the [`Driver`] on first use. Release is implicit: dropping the guard
//! decrements the refcount, and the registry runs the screen's real
//! teardown when the count reaches zero. The screen implementation never
//! learns that it is shared.
//!
//! ```ignore
//! let screen = drm_screen_share::acquire_shared(&driver, fd.as_fd())?;
//! // ... use the screen; dropping it releases the registry reference.
//! ```
//!
//! Unix-only: identity resolution relies on fd metadata.

pub mod error;
pub mod identity;
pub mod probe;
pub mod registry;
pub mod winsys;


pub use error::{Error, Result};
pub use identity::DeviceIdentity;
pub use probe::{DEFAULT_RENDER_NODE, Driver, PIPE_CAP_BIT, create_screen_default, create_screen_from_fd};
pub use registry::{Screen, ScreenRegistry, SharedScreen, registry};
pub use winsys::{acquire_default, acquire_shared};
