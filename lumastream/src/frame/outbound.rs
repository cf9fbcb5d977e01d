//! Outbound frame port.

use std::sync::Arc;

use image::RgbaImage;
use tracing::{info, warn};

use crate::control::ControlState;

use super::error::PortError;
use super::link::{FrameTransport, SendLink};

/// Pushes processed frames to an external consumer through a named
/// channel.
///
/// Unlike the inbound port it is only invoked when the worker has a
/// result to forward, so every call carries data; the transport
/// reports acceptance as a boolean.
pub struct OutboundPort {
    name: String,
    transport: Arc<dyn FrameTransport>,
    link: Option<Box<dyn SendLink>>,
    state: Arc<ControlState>,
}

impl OutboundPort {
    /// Connect the port.
    pub fn connect(
        transport: Arc<dyn FrameTransport>,
        name: &str,
        state: Arc<ControlState>,
    ) -> Result<Self, PortError> {
        let link = transport.connect_sender(name)?;
        if state.verbosity() >= 2 {
            info!(name, "frame sender ready");
        }
        Ok(Self {
            name: name.to_string(),
            transport,
            link: Some(link),
            state,
        })
    }

    /// Logical channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forward one frame. Returns whether the transport accepted it.
    pub fn send_frame(&mut self, image: &RgbaImage) -> bool {
        match self.link.as_mut() {
            Some(link) => link.push_frame(image.as_raw(), image.width(), image.height()),
            None => false,
        }
    }

    /// Tear down and reconnect using the same logical name.
    pub fn restart(&mut self) -> bool {
        if self.state.verbosity() >= 1 {
            info!(name = %self.name, "frame sender restarting");
        }
        if let Some(mut link) = self.link.take() {
            link.release();
        }
        match self.transport.connect_sender(&self.name) {
            Ok(link) => {
                self.link = Some(link);
                true
            }
            Err(e) => {
                if self.state.verbosity() >= 1 {
                    warn!(name = %self.name, error = %e, "frame sender restart failed");
                }
                false
            }
        }
    }

    /// Release the connection. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            if self.state.verbosity() >= 1 {
                info!(name = %self.name, "frame sender closing");
            }
            link.release();
        }
    }
}

impl Drop for OutboundPort {
    fn drop(&mut self) {
        self.close();
    }
}
