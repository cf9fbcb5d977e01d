//! OSC command channel.
//!
//! Receives short OSC-over-UDP commands and translates each into a
//! mutation of the shared [`ControlState`](crate::control::ControlState).
//! The decoder covers only the minimal command set the pipeline
//! understands: plain messages with string, int32 and float32
//! arguments. Unknown addresses are ignored silently; malformed
//! packets are logged and skipped.

mod command;
mod error;
mod listener;
mod message;

pub use command::{apply_command, Command};
pub use error::OscError;
pub use listener::CommandListener;
pub use message::{decode_message, OscArg, OscMessage};
