//! Frame exchange ports.
//!
//! Two independent, named channels move pixels in and out of the
//! pipeline: an inbound port pulling frames from an external producer
//! and an outbound port pushing processed frames to an external
//! consumer. The underlying shared-frame transport is opaque behind
//! the [`FrameTransport`] trait; ports add the lifecycle the worker
//! relies on (negotiated size, transfer buffer, restart-on-demand,
//! idempotent close).
//!
//! Pixel contract: RGBA, 8 bits per channel, row-major top-to-bottom,
//! `width * height * 4` bytes per frame.

mod error;
mod inbound;
mod link;
mod loopback;
mod outbound;

pub use error::PortError;
pub use inbound::InboundPort;
pub use link::{FrameTransport, LinkPoll, ReceiveLink, SendLink};
pub use loopback::LoopbackHub;
pub use outbound::OutboundPort;

/// Bytes per pixel in the frame exchange format.
pub const BYTES_PER_PIXEL: usize = 4;

/// Transfer buffer size for a negotiated width and height.
pub(crate) fn buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}
