//! Service-level errors.

use thiserror::Error;

use crate::engine::EngineError;
use crate::frame::PortError;
use crate::osc::OscError;

/// Errors raised while starting or running the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("command listener error: {0}")]
    Listener(#[from] OscError),

    #[error("frame port error: {0}")]
    Port(#[from] PortError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },
}
