//! Error types for screen acquisition.

use snafu::Snafu;

/// Result type for screen acquisition operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while acquiring or constructing a screen.
///
/// No variant is retried anywhere in this crate; every failure surfaces
/// immediately from the entry point that hit it.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Metadata query or duplication failed on a caller-supplied handle.
    #[snafu(display("device handle error: {source}"))]
    Handle { source: std::io::Error },

    /// A device context could not be opened from a handle or device node.
    #[snafu(display("failed to open device {device}: {source}"))]
    DeviceOpen { device: String, source: std::io::Error },

    /// Core enumeration ended before any core advertised the required
    /// pipeline capability.
    #[snafu(display("no core with the required pipeline capability ({probed} probed)"))]
    CapabilityNotFound { probed: u32 },

    /// The external screen constructor failed after a capable core was found.
    #[snafu(display("screen construction failed: {reason}"))]
    Construction { reason: String },
}
