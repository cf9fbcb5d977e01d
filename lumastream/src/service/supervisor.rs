//! Pipeline supervisor.
//!
//! Brings the full pipeline up in order (engine prepared and warmed
//! before any port opens, listener bound before the worker runs),
//! runs the two long-lived threads, and tears everything down when
//! asked. Can be cleanly shut down by calling `shutdown()` followed
//! by `join()`, or by dropping the `PipelineService` instance.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::control::ControlState;
use crate::engine::GenerationEngine;
use crate::frame::{FrameTransport, InboundPort, OutboundPort};
use crate::osc::CommandListener;
use crate::worker::{prepare_engine, GenerationWorker};

use super::config::ServiceConfig;
use super::error::ServiceError;

/// Handle to the running pipeline threads.
pub struct PipelineService {
    listener_handle: Option<JoinHandle<()>>,
    worker_handle: Option<JoinHandle<u64>>,
    state: Arc<ControlState>,
    /// Port the listener actually bound, for callers that passed 0.
    osc_port: u16,
}

impl PipelineService {
    /// Start the pipeline.
    ///
    /// Startup order matters: engine preparation and warmup complete
    /// before either frame port opens, so peers never see a connected
    /// port that cannot yet produce frames. Any failure here aborts
    /// startup with nothing left running.
    pub fn start<E>(
        config: &ServiceConfig,
        engine: E,
        transport: Arc<dyn FrameTransport>,
        state: Arc<ControlState>,
    ) -> Result<Self, ServiceError>
    where
        E: GenerationEngine + 'static,
    {
        let listener =
            CommandListener::bind(&config.osc.ip.to_string(), config.osc.port, Arc::clone(&state))?;
        let osc_port = listener.port();
        info!(ip = %config.osc.ip, port = osc_port, "command listener bound");

        let engine = prepare_engine(engine, &config.engine, &state)?;

        let inbound = InboundPort::connect(
            Arc::clone(&transport),
            &config.frame.inbound_name,
            config.engine.width,
            config.engine.height,
            Arc::clone(&state),
        )?;
        let outbound = OutboundPort::connect(
            Arc::clone(&transport),
            &config.frame.outbound_name,
            Arc::clone(&state),
        )?;

        let worker = GenerationWorker::new(
            engine,
            inbound,
            outbound,
            Arc::clone(&state),
            config.engine.delta,
            config.worker.idle_sleep,
        );

        let listener_handle = thread::Builder::new()
            .name("osc-listener".to_string())
            .spawn(move || listener.run())
            .map_err(|source| ServiceError::Spawn {
                name: "osc-listener",
                source,
            })?;

        let worker_handle = thread::Builder::new()
            .name("generation-worker".to_string())
            .spawn(move || worker.run())
            .map_err(|source| ServiceError::Spawn {
                name: "generation-worker",
                source,
            })?;

        info!("pipeline service started");
        Ok(Self {
            listener_handle: Some(listener_handle),
            worker_handle: Some(worker_handle),
            state,
            osc_port,
        })
    }

    /// Port the command listener bound to.
    pub fn osc_port(&self) -> u16 {
        self.osc_port
    }

    /// Shared control state.
    pub fn state(&self) -> &Arc<ControlState> {
        &self.state
    }

    /// Whether both threads are still running.
    pub fn is_running(&self) -> bool {
        let listener_alive = self
            .listener_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished());
        let worker_alive = self
            .worker_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished());
        listener_alive && worker_alive
    }

    /// Signal both threads to stop.
    pub fn shutdown(&self) {
        info!("pipeline service shutting down");
        self.state.shutdown.set();
    }

    /// Wait for both threads to exit. Returns frames processed by the
    /// worker, or 0 if a thread panicked.
    pub fn join(&mut self) -> u64 {
        if let Some(handle) = self.listener_handle.take() {
            if handle.join().is_err() {
                warn!("command listener thread panicked");
            }
        }
        let frames = match self.worker_handle.take() {
            Some(handle) => match handle.join() {
                Ok(frames) => frames,
                Err(_) => {
                    warn!("generation worker thread panicked");
                    0
                }
            },
            None => 0,
        };
        info!(frames, "pipeline service stopped");
        frames
    }
}

impl Drop for PipelineService {
    fn drop(&mut self) {
        if self.listener_handle.is_some() || self.worker_handle.is_some() {
            self.shutdown();
            self.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineConfig, SyntheticEngine};
    use crate::frame::LoopbackHub;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::{Duration, Instant};

    fn test_config() -> ServiceConfig {
        ServiceConfig {
            osc: crate::service::OscSettings {
                ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
                // Ephemeral port so parallel tests never collide.
                port: 0,
            },
            engine: EngineConfig {
                width: 2,
                height: 2,
                warmup_passes: 1,
                ..EngineConfig::default()
            },
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn test_start_shutdown_join() {
        let state = Arc::new(ControlState::new("abstract shape", "blurry", 0));
        let hub = LoopbackHub::new();
        let mut service = PipelineService::start(
            &test_config(),
            SyntheticEngine::new(2),
            Arc::new(hub),
            Arc::clone(&state),
        )
        .unwrap();

        assert!(service.osc_port() > 0);
        assert!(service.is_running());

        service.shutdown();
        service.join();
        assert!(!service.is_running());
    }

    #[test]
    fn test_worker_enables_output_on_start() {
        let state = Arc::new(ControlState::new("abstract shape", "blurry", 0));
        let hub = LoopbackHub::new();
        let service = PipelineService::start(
            &test_config(),
            SyntheticEngine::new(2),
            Arc::new(hub),
            Arc::clone(&state),
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !state.output_enabled.is_set() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(state.output_enabled.is_set());
        drop(service);
    }

    #[test]
    fn test_continuous_generation_end_to_end() {
        let state = Arc::new(ControlState::new("abstract shape", "blurry", 0));
        let hub = LoopbackHub::new();
        let mut service = PipelineService::start(
            &test_config(),
            SyntheticEngine::new(2),
            Arc::new(hub.clone()),
            Arc::clone(&state),
        )
        .unwrap();

        state.continuous.set();
        hub.publish("SourceImage", &[40u8; 2 * 2 * 4], 2, 2);

        let deadline = Instant::now() + Duration::from_secs(2);
        while hub.published_count("LumaStream") == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(hub.published_count("LumaStream"), 1);

        service.shutdown();
        assert_eq!(service.join(), 1);
    }
}
