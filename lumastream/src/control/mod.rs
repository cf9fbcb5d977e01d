//! Shared control state for the pipeline.
//!
//! A single [`ControlState`] instance is constructed by the supervisor
//! and shared (by `Arc`) with the command listener and the generation
//! worker. It is the only communication channel between the two: the
//! listener mutates it, the worker polls it once per loop iteration.
//!
//! Every signal is individually race-safe, but no atomicity is
//! guaranteed across fields. Consumers poll rather than block, so the
//! whole pipeline stays responsive to the shutdown signal.

mod signal;
mod state;

pub use signal::{Level, Pulse};
pub use state::{ControlState, PromptUpdate};
