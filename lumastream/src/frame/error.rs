//! Error types for the frame exchange ports.

use thiserror::Error;

/// Errors surfaced by port construction.
///
/// Runtime transfer failures deliberately stay out of this type: a
/// missed frame is a normal `None`, a failed send or restart is a
/// boolean the worker decides how to handle.
#[derive(Debug, Error)]
pub enum PortError {
    /// Could not connect a link with the given logical name.
    #[error("failed to connect frame channel '{name}': {reason}")]
    Connect { name: String, reason: String },

    /// Frame dimensions that do not describe a valid image.
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}
