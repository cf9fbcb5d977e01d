//! Error types for the OSC command channel.

use std::io;
use thiserror::Error;

/// Errors that can occur while receiving or decoding OSC commands.
#[derive(Debug, Error)]
pub enum OscError {
    /// Failed to bind the UDP socket.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    /// Failed to configure the socket (read timeout).
    #[error("failed to configure UDP socket: {0}")]
    Socket(#[from] io::Error),

    /// Packet is not a decodable OSC message.
    #[error("malformed OSC packet: {0}")]
    Malformed(String),

    /// OSC bundles are not part of the minimal command set.
    #[error("OSC bundles are not supported")]
    BundleUnsupported,

    /// Type tag this decoder does not handle.
    #[error("unsupported OSC type tag '{0}'")]
    UnsupportedType(char),

    /// Recognized command carrying an argument of the wrong type.
    #[error("invalid argument for {address}: {reason}")]
    BadArgument { address: String, reason: String },
}
