//! The shared control state instance.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::RwLock;

use crossbeam_channel::{Receiver, Sender};

use super::signal::{Level, Pulse};

/// Number of distinct verbosity levels (0..=3).
const VERBOSITY_LEVELS: u8 = 4;

/// A pending prompt change produced by the command listener and
/// consumed by the generation worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptUpdate {
    /// Positive prompt text.
    pub prompt: String,
    /// Negative prompt text.
    pub negative_prompt: String,
}

/// Process-wide pipeline control state.
///
/// Constructed once by the supervisor and injected into the command
/// listener and the generation worker. Fields are individually
/// race-safe; there is no multi-field transaction. The prompt update
/// queue is FIFO and unbounded, drained one entry per worker
/// iteration.
pub struct ControlState {
    current_prompt: RwLock<String>,
    current_negative_prompt: RwLock<String>,
    prompt_tx: Sender<PromptUpdate>,
    prompt_rx: Receiver<PromptUpdate>,

    /// One-off generation request, consumed per iteration.
    pub trigger: Pulse,
    /// Continuous generation mode, persists until stopped.
    pub continuous: Level,
    /// Request to leave continuous mode; the worker clears both this
    /// and `continuous` together.
    pub stop: Pulse,
    /// Gates whether generated frames are pushed to the outbound port.
    pub output_enabled: Level,
    /// Request to tear down and reconnect both frame ports.
    pub restart_ports: Pulse,
    /// Terminal shutdown signal; only the supervisor sets this.
    pub shutdown: Level,

    verbosity: AtomicU8,
}

impl ControlState {
    /// Create the control state with initial prompts and verbosity.
    ///
    /// Verbosity is clamped to 0..=3.
    pub fn new(prompt: &str, negative_prompt: &str, verbosity: u8) -> Self {
        let (prompt_tx, prompt_rx) = crossbeam_channel::unbounded();
        Self {
            current_prompt: RwLock::new(prompt.to_string()),
            current_negative_prompt: RwLock::new(negative_prompt.to_string()),
            prompt_tx,
            prompt_rx,
            trigger: Pulse::new(),
            continuous: Level::new(),
            stop: Pulse::new(),
            output_enabled: Level::new(),
            restart_ports: Pulse::new(),
            shutdown: Level::new(),
            verbosity: AtomicU8::new(verbosity.min(VERBOSITY_LEVELS - 1)),
        }
    }

    /// Current positive prompt (last writer wins).
    pub fn current_prompt(&self) -> String {
        self.current_prompt
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Current negative prompt (last writer wins).
    pub fn current_negative_prompt(&self) -> String {
        self.current_negative_prompt
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Overwrite the current positive prompt.
    pub fn set_prompt(&self, prompt: &str) {
        *self
            .current_prompt
            .write()
            .unwrap_or_else(|e| e.into_inner()) = prompt.to_string();
    }

    /// Overwrite the current negative prompt.
    pub fn set_negative_prompt(&self, negative_prompt: &str) {
        *self
            .current_negative_prompt
            .write()
            .unwrap_or_else(|e| e.into_inner()) = negative_prompt.to_string();
    }

    /// Enqueue the current prompt pair for the worker to apply.
    pub fn queue_prompt_update(&self) {
        // The channel is unbounded; send only fails if the receiver is
        // gone, which means the process is tearing down anyway.
        let _ = self.prompt_tx.send(PromptUpdate {
            prompt: self.current_prompt(),
            negative_prompt: self.current_negative_prompt(),
        });
    }

    /// Dequeue one pending prompt update without blocking.
    pub fn try_next_prompt_update(&self) -> Option<PromptUpdate> {
        self.prompt_rx.try_recv().ok()
    }

    /// Number of pending prompt updates.
    pub fn pending_prompt_updates(&self) -> usize {
        self.prompt_rx.len()
    }

    /// Current verbosity level (0..=3). Stale reads are acceptable.
    pub fn verbosity(&self) -> u8 {
        self.verbosity.load(Ordering::Relaxed)
    }

    /// Set the verbosity level. Callers validate the 0..=3 range.
    pub fn set_verbosity(&self, level: u8) {
        self.verbosity
            .store(level.min(VERBOSITY_LEVELS - 1), Ordering::Relaxed);
    }

    /// Cycle verbosity 0 -> 1 -> 2 -> 3 -> 0, returning the new level.
    pub fn cycle_verbosity(&self) -> u8 {
        let next = (self.verbosity.load(Ordering::Relaxed) + 1) % VERBOSITY_LEVELS;
        self.verbosity.store(next, Ordering::Relaxed);
        next
    }
}
