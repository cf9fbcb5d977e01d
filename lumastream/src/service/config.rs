//! Service configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::engine::EngineConfig;
use crate::worker::DEFAULT_IDLE_SLEEP;

/// Command listener settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OscSettings {
    /// Address the UDP socket binds to.
    pub ip: IpAddr,
    /// Port the UDP socket binds to.
    pub port: u16,
}

impl Default for OscSettings {
    fn default() -> Self {
        Self {
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 7000,
        }
    }
}

/// Frame exchange settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSettings {
    /// Logical name of the channel frames are read from.
    pub inbound_name: String,
    /// Logical name of the channel generated frames are written to.
    pub outbound_name: String,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            inbound_name: "SourceImage".to_string(),
            outbound_name: "LumaStream".to_string(),
        }
    }
}

/// Worker loop settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSettings {
    /// Sleep between iterations that had no work.
    pub idle_sleep: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            idle_sleep: DEFAULT_IDLE_SLEEP,
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub osc: OscSettings,
    pub frame: FrameSettings,
    pub engine: EngineConfig,
    pub worker: WorkerSettings,
}
