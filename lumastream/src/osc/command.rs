//! Command decoding and dispatch.
//!
//! Maps OSC addresses to typed [`Command`]s and applies each command
//! as a single mutation of the shared control state. Chatty output is
//! gated by the runtime verbosity level; verbosity commands themselves
//! always report.

use tracing::{info, warn};

use crate::control::ControlState;

use super::error::OscError;
use super::message::OscMessage;

/// Longest prompt prefix echoed to the log.
const PROMPT_LOG_CHARS: usize = 40;

/// A recognized control command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Set prompts and enqueue the pair for the worker. Either part
    /// may be absent; a bare `/prompt` re-enqueues the current pair.
    Prompt {
        prompt: Option<String>,
        negative_prompt: Option<String>,
    },
    /// Request a single generation pass.
    Trigger,
    /// Enter continuous generation mode.
    Start,
    /// Request leaving continuous mode.
    Stop,
    /// Enable pushing generated frames.
    OutputOn,
    /// Disable pushing generated frames.
    OutputOff,
    /// Set the verbosity level, or report it when no level is given.
    VerboseSet(Option<i32>),
    /// Cycle verbosity 0 -> 1 -> 2 -> 3 -> 0.
    VerboseCycle,
    /// Shortcut for verbosity 2.
    VerboseOn,
    /// Shortcut for verbosity 0.
    VerboseOff,
    /// Request a restart of both frame ports.
    RestartPorts,
}

impl Command {
    /// Decode a message into a command.
    ///
    /// Returns `Ok(None)` for unknown addresses (ignored silently) and
    /// an error for a recognized address with arguments that cannot be
    /// coerced.
    pub fn from_message(msg: &OscMessage) -> Result<Option<Command>, OscError> {
        let command = match msg.address.as_str() {
            "/prompt" => Command::Prompt {
                prompt: msg.args.first().map(|a| a.to_text()),
                negative_prompt: msg.args.get(1).map(|a| a.to_text()),
            },
            "/trigger" | "/t" => Command::Trigger,
            "/start" | "/s" => Command::Start,
            "/stop" | "/S" => Command::Stop,
            "/p" => Command::OutputOn,
            "/P" => Command::OutputOff,
            "/verbose" => match msg.args.first() {
                None => Command::VerboseSet(None),
                Some(arg) => {
                    let level = arg.as_int().ok_or_else(|| OscError::BadArgument {
                        address: msg.address.clone(),
                        reason: format!("expected a numeric level, got {arg:?}"),
                    })?;
                    Command::VerboseSet(Some(level))
                }
            },
            "/v" => Command::VerboseCycle,
            "/von" => Command::VerboseOn,
            "/voff" => Command::VerboseOff,
            "/x" => Command::RestartPorts,
            _ => return Ok(None),
        };
        Ok(Some(command))
    }
}

/// Apply a command to the control state.
pub fn apply_command(command: Command, state: &ControlState) {
    let verbosity = state.verbosity();
    match command {
        Command::Prompt {
            prompt,
            negative_prompt,
        } => {
            if let Some(prompt) = prompt {
                if verbosity >= 2 {
                    info!("Prompt: {}", truncate(&prompt, PROMPT_LOG_CHARS));
                }
                state.set_prompt(&prompt);
            }
            if let Some(negative) = negative_prompt {
                if verbosity >= 3 {
                    info!("Negative prompt: {negative}");
                }
                state.set_negative_prompt(&negative);
            }
            state.queue_prompt_update();
        }
        Command::Trigger => {
            if verbosity >= 2 {
                info!("Generation triggered");
            }
            state.trigger.raise();
        }
        Command::Start => {
            // Only report when the state actually changes.
            if !state.continuous.is_set() && verbosity >= 2 {
                info!("Continuous started");
            }
            state.continuous.set();
        }
        Command::Stop => {
            if state.continuous.is_set() && verbosity >= 2 {
                info!("Continuous stopped");
            }
            state.stop.raise();
        }
        Command::OutputOn => {
            if !state.output_enabled.is_set() && verbosity >= 2 {
                info!("Output enabled");
            }
            state.output_enabled.set();
        }
        Command::OutputOff => {
            if state.output_enabled.is_set() && verbosity >= 2 {
                info!("Output disabled");
            }
            state.output_enabled.clear();
        }
        Command::VerboseSet(None) => {
            info!("Current verbose level: {}", state.verbosity());
        }
        Command::VerboseSet(Some(level)) => {
            if (0..=3).contains(&level) {
                state.set_verbosity(level as u8);
                info!("Verbose level set to: {level}");
            } else {
                warn!("Invalid verbose level: {level} (must be 0-3)");
            }
        }
        Command::VerboseCycle => {
            let level = state.cycle_verbosity();
            info!("Verbose level: {level}");
        }
        Command::VerboseOn => {
            state.set_verbosity(2);
            info!("Verbose level: 2");
        }
        Command::VerboseOff => {
            state.set_verbosity(0);
            info!("Verbose level: 0 (quiet)");
        }
        Command::RestartPorts => {
            if verbosity >= 1 {
                info!("Frame port restart requested");
            }
            state.restart_ports.raise();
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
