//! The opaque shared-frame transport contract.
//!
//! A transport hands out receive and send links identified by logical
//! name. Links never block: polling for a frame when none is pending
//! is a normal, frequent outcome. Implementations wrap whatever
//! OS-level frame sharing mechanism is in use; [`super::LoopbackHub`]
//! is the in-process reference implementation.

use super::error::PortError;

/// Outcome of polling the producer side of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPoll {
    /// No new frame since the last poll.
    Empty,
    /// A frame matching the negotiated size was copied into the
    /// caller's buffer.
    Frame,
    /// The producer advertises a different size; nothing was copied.
    /// The caller reallocates and polls again.
    Resized { width: u32, height: u32 },
}

/// Receiving end of a named frame channel.
pub trait ReceiveLink: Send {
    /// Poll for a new frame at the negotiated size.
    ///
    /// `buffer` must hold `width * height * 4` bytes. Never blocks.
    fn poll_frame(&mut self, width: u32, height: u32, buffer: &mut [u8]) -> LinkPoll;

    /// Release the underlying connection. Idempotent.
    fn release(&mut self);
}

/// Sending end of a named frame channel.
pub trait SendLink: Send {
    /// Publish one RGBA frame. Returns whether the transport accepted
    /// it.
    fn push_frame(&mut self, pixels: &[u8], width: u32, height: u32) -> bool;

    /// Release the underlying connection. Idempotent.
    fn release(&mut self);
}

/// Factory for links, keyed by logical channel name.
///
/// Shared between the supervisor (initial connect) and the ports
/// (reconnect on restart), so it must be usable from multiple threads.
pub trait FrameTransport: Send + Sync {
    /// Connect the receiving end of the named channel.
    fn connect_receiver(&self, name: &str) -> Result<Box<dyn ReceiveLink>, PortError>;

    /// Connect the sending end of the named channel.
    fn connect_sender(&self, name: &str) -> Result<Box<dyn SendLink>, PortError>;
}
