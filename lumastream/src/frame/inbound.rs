//! Inbound frame port.

use std::sync::Arc;

use image::RgbaImage;
use tracing::{info, warn};

use crate::control::ControlState;

use super::buffer_len;
use super::error::PortError;
use super::link::{FrameTransport, LinkPoll, ReceiveLink};

/// Pulls frames from an external producer through a named channel.
///
/// Owns the negotiated width/height and a transfer buffer of
/// `width * height * 4` bytes, reallocated whenever the producer's
/// advertised size changes.
pub struct InboundPort {
    name: String,
    transport: Arc<dyn FrameTransport>,
    link: Option<Box<dyn ReceiveLink>>,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
    state: Arc<ControlState>,
}

impl InboundPort {
    /// Connect the port with an initial negotiated size.
    pub fn connect(
        transport: Arc<dyn FrameTransport>,
        name: &str,
        width: u32,
        height: u32,
        state: Arc<ControlState>,
    ) -> Result<Self, PortError> {
        if width == 0 || height == 0 {
            return Err(PortError::InvalidDimensions { width, height });
        }
        let link = transport.connect_receiver(name)?;
        if state.verbosity() >= 2 {
            info!(name, "frame receiver ready");
        }
        Ok(Self {
            name: name.to_string(),
            transport,
            link: Some(link),
            width,
            height,
            buffer: vec![0u8; buffer_len(width, height)],
            state,
        })
    }

    /// Currently negotiated size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Logical channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Poll for a new frame.
    ///
    /// Returns `None` when no new frame is pending, which is a normal,
    /// frequent outcome. When the producer's size changed, the
    /// transfer buffer is reallocated and the poll retried once
    /// against the new size before giving up for this cycle.
    pub fn receive_frame(&mut self) -> Option<RgbaImage> {
        let link = self.link.as_mut()?;
        match link.poll_frame(self.width, self.height, &mut self.buffer) {
            LinkPoll::Empty => None,
            LinkPoll::Frame => image_from_buffer(self.width, self.height, &self.buffer),
            LinkPoll::Resized { width, height } => {
                self.width = width;
                self.height = height;
                self.buffer = vec![0u8; buffer_len(width, height)];
                if self.state.verbosity() >= 2 {
                    info!(name = %self.name, width, height, "frame input resized");
                }
                match link.poll_frame(self.width, self.height, &mut self.buffer) {
                    LinkPoll::Frame => image_from_buffer(self.width, self.height, &self.buffer),
                    _ => None,
                }
            }
        }
    }

    /// Tear down and reconnect using the same logical name.
    ///
    /// Failure is returned, never raised; the worker decides whether
    /// to retry or skip the cycle.
    pub fn restart(&mut self) -> bool {
        if self.state.verbosity() >= 1 {
            info!(name = %self.name, "frame receiver restarting");
        }
        if let Some(mut link) = self.link.take() {
            link.release();
        }
        match self.transport.connect_receiver(&self.name) {
            Ok(link) => {
                self.link = Some(link);
                true
            }
            Err(e) => {
                if self.state.verbosity() >= 1 {
                    warn!(name = %self.name, error = %e, "frame receiver restart failed");
                }
                false
            }
        }
    }

    /// Release the connection. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            if self.state.verbosity() >= 1 {
                info!(name = %self.name, "frame receiver closing");
            }
            link.release();
        }
    }
}

impl Drop for InboundPort {
    fn drop(&mut self) {
        self.close();
    }
}

fn image_from_buffer(width: u32, height: u32, buffer: &[u8]) -> Option<RgbaImage> {
    RgbaImage::from_raw(width, height, buffer.to_vec())
}
