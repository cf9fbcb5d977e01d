//! UDP receive loop for the command channel.

use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::control::ControlState;

use super::command::{apply_command, Command};
use super::error::OscError;
use super::message::decode_message;

/// Maximum datagram size we accept; commands are short, prompts are
/// the only sizeable payload.
const MAX_PACKET_SIZE: usize = 8192;

/// Bounded wait per receive call, so the loop can observe the
/// shutdown signal periodically. A timeout is not an error.
const RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Backoff after a genuine socket error before retrying.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// OSC command listener.
///
/// Binds a UDP socket and translates each recognized datagram into a
/// control-state mutation. Runs until the shutdown signal is set.
pub struct CommandListener {
    socket: UdpSocket,
    state: Arc<ControlState>,
    buffer: [u8; MAX_PACKET_SIZE],
}

impl CommandListener {
    /// Bind the listener on `ip:port`.
    ///
    /// Port 0 binds an ephemeral port; use [`CommandListener::port`]
    /// to discover it.
    pub fn bind(ip: &str, port: u16, state: Arc<ControlState>) -> Result<Self, OscError> {
        let addr = format!("{ip}:{port}");
        let socket = UdpSocket::bind(&addr).map_err(|source| OscError::Bind {
            addr: addr.clone(),
            source,
        })?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;

        Ok(Self {
            socket,
            state,
            buffer: [0u8; MAX_PACKET_SIZE],
        })
    }

    /// The actually bound port.
    pub fn port(&self) -> u16 {
        self.socket
            .local_addr()
            .map(|a| a.port())
            .unwrap_or_default()
    }

    /// Run the receive loop until shutdown is observed.
    pub fn run(mut self) {
        if self.state.verbosity() >= 1 {
            info!(
                addr = %self.socket.local_addr().map(|a| a.to_string()).unwrap_or_default(),
                "OSC listener started"
            );
        }

        while !self.state.shutdown.is_set() {
            match self.socket.recv(&mut self.buffer) {
                Ok(len) => self.handle_datagram(&self.buffer[..len]),
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    // Bounded wait elapsed; loop back and recheck the
                    // shutdown signal.
                    trace!("no command received (timeout)");
                }
                Err(e) => {
                    warn!(error = %e, "UDP receive error");
                    std::thread::sleep(ERROR_BACKOFF);
                }
            }
        }

        if self.state.verbosity() >= 1 {
            info!("OSC listener stopped");
        }
    }

    /// Decode and dispatch one datagram. Failures never propagate past
    /// the message.
    pub fn handle_datagram(&self, datagram: &[u8]) {
        match decode_message(datagram) {
            Ok(msg) => match Command::from_message(&msg) {
                Ok(Some(command)) => apply_command(command, &self.state),
                Ok(None) => {
                    // Unknown address: ignored silently per contract.
                    trace!(address = %msg.address, "ignoring unknown OSC address");
                }
                Err(e) => warn!(error = %e, "invalid command arguments"),
            },
            Err(e) => debug!(error = %e, "dropping malformed OSC packet"),
        }
    }
}
