//! In-process loopback implementation of the frame transport.
//!
//! Each named channel is a single slot holding the most recent frame
//! plus a sequence number. Receivers remember the last sequence they
//! consumed, so a slot is observed at most once per published frame,
//! matching the "no new frame" semantics of real shared-frame
//! transports. Used by the integration tests and the CLI's
//! self-contained mode.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::error::PortError;
use super::link::{FrameTransport, LinkPoll, ReceiveLink, SendLink};

#[derive(Default)]
struct Slot {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    seq: u64,
}

type SharedSlot = Arc<Mutex<Slot>>;

/// In-process frame hub.
///
/// Cloning shares the underlying channels, so a hub handed to the
/// service and a hub kept by a test observe the same frames.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    slots: Arc<Mutex<HashMap<String, SharedSlot>>>,
}

impl LoopbackHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, name: &str) -> SharedSlot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(name.to_string()).or_default())
    }

    /// Publish a frame into the named channel from outside the
    /// pipeline (the test's stand-in for an external producer).
    pub fn publish(&self, name: &str, pixels: &[u8], width: u32, height: u32) {
        let slot = self.slot(name);
        let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.pixels = pixels.to_vec();
        slot.width = width;
        slot.height = height;
        slot.seq += 1;
    }

    /// Latest frame in the named channel, if any was ever published
    /// (the test's stand-in for an external consumer).
    pub fn latest(&self, name: &str) -> Option<(Vec<u8>, u32, u32)> {
        let slot = self.slot(name);
        let slot = slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.seq == 0 {
            return None;
        }
        Some((slot.pixels.clone(), slot.width, slot.height))
    }

    /// Number of frames ever published into the named channel.
    pub fn published_count(&self, name: &str) -> u64 {
        let slot = self.slot(name);
        let seq = slot.lock().unwrap_or_else(|e| e.into_inner()).seq;
        seq
    }
}

impl FrameTransport for LoopbackHub {
    fn connect_receiver(&self, name: &str) -> Result<Box<dyn ReceiveLink>, PortError> {
        Ok(Box::new(LoopbackReceiver {
            slot: self.slot(name),
            last_seq: 0,
            released: false,
        }))
    }

    fn connect_sender(&self, name: &str) -> Result<Box<dyn SendLink>, PortError> {
        Ok(Box::new(LoopbackSender {
            slot: self.slot(name),
            released: false,
        }))
    }
}

struct LoopbackReceiver {
    slot: SharedSlot,
    last_seq: u64,
    released: bool,
}

impl ReceiveLink for LoopbackReceiver {
    fn poll_frame(&mut self, width: u32, height: u32, buffer: &mut [u8]) -> LinkPoll {
        if self.released {
            return LinkPoll::Empty;
        }
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.seq == 0 || slot.seq == self.last_seq {
            return LinkPoll::Empty;
        }
        if slot.width != width || slot.height != height {
            // Leave the sequence unconsumed so the retry after
            // reallocation picks this frame up.
            return LinkPoll::Resized {
                width: slot.width,
                height: slot.height,
            };
        }
        buffer.copy_from_slice(&slot.pixels);
        self.last_seq = slot.seq;
        LinkPoll::Frame
    }

    fn release(&mut self) {
        self.released = true;
    }
}

struct LoopbackSender {
    slot: SharedSlot,
    released: bool,
}

impl SendLink for LoopbackSender {
    fn push_frame(&mut self, pixels: &[u8], width: u32, height: u32) -> bool {
        if self.released {
            return false;
        }
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.pixels = pixels.to_vec();
        slot.width = width;
        slot.height = height;
        slot.seq += 1;
        true
    }

    fn release(&mut self) {
        self.released = true;
    }
}
