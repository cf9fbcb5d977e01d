//! The generation worker.
//!
//! Owns the engine, both frame ports, and the prompt cache; polls the
//! shared control state once per loop iteration. Every per-iteration
//! failure (port hiccup, bad prompt, failed inference) is contained
//! and logged so one bad input never terminates the worker; only the
//! shutdown signal ends the loop.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::control::{ControlState, PromptUpdate};
use crate::engine::{EngineConfig, EngineError, GenerationEngine, PromptCache};
use crate::frame::{InboundPort, OutboundPort};

/// Loop cadence when an iteration had nothing to do. Polling at this
/// interval keeps command-to-effect latency well under perception
/// while avoiding a busy spin.
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Prepare and warm up an engine before the ports are opened.
///
/// Runs the configured number of warmup passes on an all-zero RGBA
/// image at the target resolution, forcing lazy allocations and
/// compilation paths through before real frames arrive. Failure here
/// is fatal: the worker loop must not start on a half-initialized
/// engine.
pub fn prepare_engine<E: GenerationEngine>(
    mut engine: E,
    config: &EngineConfig,
    state: &ControlState,
) -> Result<E, EngineError> {
    if state.verbosity() >= 1 {
        info!(model = %config.model, "initializing generation engine");
    }
    engine.prepare(
        &state.current_prompt(),
        &state.current_negative_prompt(),
        config.inference_steps,
        config.guidance_scale,
        config.delta,
    )?;

    if state.verbosity() >= 1 {
        info!(passes = config.warmup_passes, "warming up generation engine");
    }
    let blank = RgbaImage::new(config.width, config.height);
    for _ in 0..config.warmup_passes {
        engine.warmup(&blank)?;
    }
    Ok(engine)
}

/// The frame loop worker.
pub struct GenerationWorker<E: GenerationEngine> {
    engine: E,
    inbound: InboundPort,
    outbound: OutboundPort,
    state: Arc<ControlState>,
    cache: PromptCache,
    delta: f32,
    idle_sleep: Duration,
    frames_processed: u64,
}

impl<E: GenerationEngine> GenerationWorker<E> {
    /// Build a worker around a prepared engine and connected ports.
    pub fn new(
        engine: E,
        inbound: InboundPort,
        outbound: OutboundPort,
        state: Arc<ControlState>,
        delta: f32,
        idle_sleep: Duration,
    ) -> Self {
        Self {
            engine,
            inbound,
            outbound,
            state,
            cache: PromptCache::new(),
            delta,
            idle_sleep,
            frames_processed: 0,
        }
    }

    /// The engine, for inspection.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The prompt cache, for inspection.
    pub fn cache(&self) -> &PromptCache {
        &self.cache
    }

    /// Frames processed so far.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Run the loop until shutdown, then close both ports.
    ///
    /// Output is enabled at loop entry so a bare `start` command
    /// streams frames without an explicit output-on.
    pub fn run(mut self) -> u64 {
        if self.state.verbosity() >= 1 {
            info!(
                inbound = %self.inbound.name(),
                outbound = %self.outbound.name(),
                "generation worker started"
            );
        }
        self.state.output_enabled.set();

        while !self.state.shutdown.is_set() {
            if !self.tick() {
                std::thread::sleep(self.idle_sleep);
            }
        }

        self.inbound.close();
        self.outbound.close();
        if self.state.verbosity() >= 1 {
            info!(frames = self.frames_processed, "generation worker stopped");
        }
        self.frames_processed
    }

    /// One loop iteration. Returns whether a frame was processed.
    ///
    /// Note on the stop/start race: `stop` and `continuous` are
    /// cleared together here, but a `start` command landing between
    /// the two clears can be lost. The flags carry no cross-field
    /// atomicity; the sender simply re-issues `start`.
    pub fn tick(&mut self) -> bool {
        // 1. Port restart request: attempt both ports, consume the
        //    pulse regardless of outcome.
        if self.state.restart_ports.take() {
            self.restart_ports();
        }

        // 2. At most one pending prompt update per iteration.
        if let Some(update) = self.state.try_next_prompt_update() {
            self.apply_prompt_update(update);
        }

        // 3. A stop request clears continuous mode; both flags drop in
        //    this single step.
        if self.state.stop.take() {
            self.state.continuous.clear();
        }

        // 4. Pull, generate, forward.
        let mut processed = false;
        if self.state.trigger.is_raised() || self.state.continuous.is_set() {
            if let Some(frame) = self.inbound.receive_frame() {
                processed = self.process_frame(frame);
            } else if self.state.verbosity() >= 3 {
                debug!("generation requested but no input frame available");
            }
            // A trigger is consumed whether or not a frame arrived.
            self.state.trigger.take();
        }
        processed
    }

    fn restart_ports(&mut self) {
        if self.state.verbosity() >= 1 {
            info!("restarting frame ports");
        }
        let inbound_ok = self.inbound.restart();
        let outbound_ok = self.outbound.restart();
        if inbound_ok && outbound_ok {
            if self.state.verbosity() >= 1 {
                info!("frame ports restarted");
            }
        } else {
            warn!(inbound_ok, outbound_ok, "frame port restart failed");
        }
    }

    /// Apply a prompt change without resetting the engine.
    ///
    /// The incremental path (swap the embedding, rescale the noise)
    /// preserves the denoising buffers; a full re-preparation would
    /// visibly corrupt the next frames. On any failure the previous
    /// prompt stays in effect.
    fn apply_prompt_update(&mut self, update: PromptUpdate) {
        let verbosity = self.state.verbosity();
        if verbosity >= 2 {
            info!(prompt = %update.prompt, "updating prompt");
        }

        let embedding = match self.cache.get(&update.prompt, &update.negative_prompt) {
            Some(cached) => {
                if verbosity >= 3 {
                    debug!("using cached prompt encoding");
                }
                cached.clone()
            }
            None => {
                if verbosity >= 3 {
                    debug!("encoding new prompt");
                }
                match self
                    .engine
                    .encode_prompt(&update.prompt, &update.negative_prompt)
                {
                    Ok(embedding) => {
                        self.cache
                            .insert(&update.prompt, &update.negative_prompt, embedding.clone());
                        embedding
                    }
                    Err(e) => {
                        warn!(error = %e, "prompt encode failed; keeping previous prompt");
                        return;
                    }
                }
            }
        };

        if let Err(e) = self.engine.apply_embedding(&embedding) {
            warn!(error = %e, "prompt update failed; keeping previous prompt");
            return;
        }
        self.engine.scale_noise(self.delta);
    }

    fn process_frame(&mut self, frame: RgbaImage) -> bool {
        self.frames_processed += 1;
        if self.state.verbosity() >= 3 {
            info!(frame = self.frames_processed, "processing frame");
        }

        let result = self
            .engine
            .preprocess(&frame)
            .and_then(|tensor| self.engine.infer(tensor));
        match result {
            Ok(output) => {
                if self.state.output_enabled.is_set() && !self.outbound.send_frame(&output) {
                    warn!("outbound port rejected frame");
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "inference failed; frame dropped");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SyntheticEngine;
    use crate::frame::LoopbackHub;

    struct Fixture {
        hub: LoopbackHub,
        state: Arc<ControlState>,
        worker: GenerationWorker<SyntheticEngine>,
    }

    /// Worker over the loopback hub with a prepared (but not warmed
    /// up) engine, so call counters start at zero for inference.
    fn fixture() -> Fixture {
        let hub = LoopbackHub::new();
        let state = Arc::new(ControlState::new("abstract shape", "blurry", 0));
        let mut engine = SyntheticEngine::new(2);
        engine
            .prepare("abstract shape", "blurry", 50, 1.2, 0.5)
            .unwrap();

        let transport: Arc<dyn crate::frame::FrameTransport> = Arc::new(hub.clone());
        let inbound =
            InboundPort::connect(Arc::clone(&transport), "in", 2, 2, Arc::clone(&state)).unwrap();
        let outbound =
            OutboundPort::connect(Arc::clone(&transport), "out", Arc::clone(&state)).unwrap();
        let worker = GenerationWorker::new(
            engine,
            inbound,
            outbound,
            Arc::clone(&state),
            0.5,
            DEFAULT_IDLE_SLEEP,
        );
        Fixture { hub, state, worker }
    }

    fn publish_frame(hub: &LoopbackHub) {
        hub.publish("in", &[50u8; 2 * 2 * 4], 2, 2);
    }

    #[test]
    fn test_idle_tick_does_nothing() {
        let mut f = fixture();
        publish_frame(&f.hub);
        assert!(!f.worker.tick());
        assert_eq!(f.worker.engine().infer_calls(), 0);
        assert_eq!(f.worker.frames_processed(), 0);
    }

    #[test]
    fn test_trigger_processes_one_frame_and_clears() {
        let mut f = fixture();
        f.state.output_enabled.set();
        publish_frame(&f.hub);
        f.state.trigger.raise();

        assert!(f.worker.tick());
        assert_eq!(f.worker.engine().infer_calls(), 1);
        assert_eq!(f.worker.frames_processed(), 1);
        assert!(!f.state.trigger.is_raised());

        // Next tick: trigger consumed, nothing happens.
        assert!(!f.worker.tick());
        assert_eq!(f.worker.engine().infer_calls(), 1);
    }

    #[test]
    fn test_trigger_clears_even_without_frame() {
        let mut f = fixture();
        f.state.trigger.raise();
        assert!(!f.worker.tick());
        assert!(!f.state.trigger.is_raised());
        assert_eq!(f.worker.frames_processed(), 0);
    }

    #[test]
    fn test_continuous_processes_every_available_frame() {
        let mut f = fixture();
        f.state.output_enabled.set();
        f.state.continuous.set();

        publish_frame(&f.hub);
        assert!(f.worker.tick());
        // Same frame is not re-delivered.
        assert!(!f.worker.tick());
        publish_frame(&f.hub);
        assert!(f.worker.tick());

        assert_eq!(f.worker.frames_processed(), 2);
        assert!(f.state.continuous.is_set());
    }

    #[test]
    fn test_stop_clears_both_flags_by_next_tick() {
        let f = fixture();
        let mut worker = f.worker;
        f.state.continuous.set();
        f.state.stop.raise();

        worker.tick();
        assert!(!f.state.continuous.is_set());
        assert!(!f.state.stop.is_raised());
    }

    #[test]
    fn test_output_disabled_still_infers_but_sends_nothing() {
        let mut f = fixture();
        f.state.output_enabled.clear();
        f.state.trigger.raise();
        publish_frame(&f.hub);

        assert!(f.worker.tick());
        assert_eq!(f.worker.engine().infer_calls(), 1);
        assert_eq!(f.hub.published_count("out"), 0);
    }

    #[test]
    fn test_output_enabled_sends_result() {
        let mut f = fixture();
        f.state.output_enabled.set();
        f.state.trigger.raise();
        publish_frame(&f.hub);

        assert!(f.worker.tick());
        assert_eq!(f.hub.published_count("out"), 1);
        let (_, width, height) = f.hub.latest("out").unwrap();
        assert_eq!((width, height), (2, 2));
    }

    #[test]
    fn test_prompt_update_encodes_and_caches() {
        let mut f = fixture();
        f.state.set_prompt("a cat");
        f.state.set_negative_prompt("blurry");
        f.state.queue_prompt_update();

        f.worker.tick();
        assert_eq!(f.worker.engine().encode_calls(), 1);
        assert!(f.worker.cache().contains("a cat", "blurry"));
        assert_eq!(f.worker.engine().apply_calls(), 1);
        assert!((f.worker.engine().noise_scale() - 0.5).abs() < f32::EPSILON);

        // Same pair again: cache hit, no second encode, but the
        // embedding is re-applied and the noise rescaled.
        f.state.queue_prompt_update();
        f.worker.tick();
        assert_eq!(f.worker.engine().encode_calls(), 1);
        assert_eq!(f.worker.engine().apply_calls(), 2);
        assert!((f.worker.engine().noise_scale() - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_one_prompt_update_per_tick() {
        let mut f = fixture();
        f.state.set_prompt("first");
        f.state.queue_prompt_update();
        f.state.set_prompt("second");
        f.state.queue_prompt_update();

        f.worker.tick();
        assert_eq!(f.state.pending_prompt_updates(), 1);
        f.worker.tick();
        assert_eq!(f.state.pending_prompt_updates(), 0);
    }

    #[test]
    fn test_prompt_encode_failure_keeps_previous_prompt() {
        let mut f = fixture();
        let before = f.worker.engine().active_embedding().cloned();

        f.worker.engine.fail_next_encode();
        f.state.set_prompt("doomed prompt");
        f.state.queue_prompt_update();
        f.worker.tick();

        assert_eq!(f.worker.engine().active_embedding().cloned(), before);
        assert!(!f.worker.cache().contains("doomed prompt", "blurry"));
        // The worker is still alive and processing.
        f.state.trigger.raise();
        publish_frame(&f.hub);
        f.state.output_enabled.set();
        assert!(f.worker.tick());
    }

    #[test]
    fn test_inference_failure_does_not_kill_worker() {
        let mut f = fixture();
        f.state.output_enabled.set();
        f.state.continuous.set();

        f.worker.engine.fail_next_infer();
        publish_frame(&f.hub);
        assert!(!f.worker.tick());
        assert_eq!(f.hub.published_count("out"), 0);

        publish_frame(&f.hub);
        assert!(f.worker.tick());
        assert_eq!(f.hub.published_count("out"), 1);
    }

    /// Transport whose receiver side refuses reconnection, for
    /// exercising the partial-restart path.
    struct FlakyTransport {
        hub: LoopbackHub,
        allow_receivers: std::sync::atomic::AtomicU32,
    }

    impl crate::frame::FrameTransport for FlakyTransport {
        fn connect_receiver(
            &self,
            name: &str,
        ) -> Result<Box<dyn crate::frame::ReceiveLink>, crate::frame::PortError> {
            use std::sync::atomic::Ordering;
            let remaining = self.allow_receivers.load(Ordering::SeqCst);
            if remaining == 0 {
                return Err(crate::frame::PortError::Connect {
                    name: name.to_string(),
                    reason: "receiver unavailable".to_string(),
                });
            }
            self.allow_receivers.store(remaining - 1, Ordering::SeqCst);
            self.hub.connect_receiver(name)
        }

        fn connect_sender(
            &self,
            name: &str,
        ) -> Result<Box<dyn crate::frame::SendLink>, crate::frame::PortError> {
            self.hub.connect_sender(name)
        }
    }

    #[test]
    fn test_restart_attempts_both_ports_even_when_one_fails() {
        let hub = LoopbackHub::new();
        let state = Arc::new(ControlState::new("abstract shape", "blurry", 0));
        let mut engine = SyntheticEngine::new(2);
        engine
            .prepare("abstract shape", "blurry", 50, 1.2, 0.5)
            .unwrap();

        // One receiver connect allowed (the initial one); the restart's
        // reconnect fails.
        let transport: Arc<dyn crate::frame::FrameTransport> = Arc::new(FlakyTransport {
            hub: hub.clone(),
            allow_receivers: std::sync::atomic::AtomicU32::new(1),
        });
        let inbound =
            InboundPort::connect(Arc::clone(&transport), "in", 2, 2, Arc::clone(&state)).unwrap();
        let outbound =
            OutboundPort::connect(Arc::clone(&transport), "out", Arc::clone(&state)).unwrap();
        let mut worker = GenerationWorker::new(
            engine,
            inbound,
            outbound,
            Arc::clone(&state),
            0.5,
            DEFAULT_IDLE_SLEEP,
        );

        state.restart_ports.raise();
        worker.tick();
        assert!(
            !state.restart_ports.is_raised(),
            "flag must clear even on failed restart"
        );

        // The outbound side was reconnected and still works.
        state.output_enabled.set();
        state.continuous.set();
        hub.publish("in", &[50u8; 2 * 2 * 4], 2, 2);
        worker.tick();
        assert_eq!(hub.published_count("out"), 0, "inbound link is gone");
    }

    #[test]
    fn test_restart_request_restarts_both_and_clears_flag() {
        let mut f = fixture();
        f.state.restart_ports.raise();
        f.worker.tick();
        assert!(!f.state.restart_ports.is_raised());

        // Ports remain usable after the restart.
        f.state.output_enabled.set();
        f.state.trigger.raise();
        publish_frame(&f.hub);
        assert!(f.worker.tick());
    }

    #[test]
    fn test_resolution_change_round_trip() {
        let mut f = fixture();
        f.state.output_enabled.set();
        f.state.continuous.set();

        f.hub.publish("in", &[10u8; 4 * 4 * 4], 4, 4);
        assert!(f.worker.tick());

        let (_, width, height) = f.hub.latest("out").unwrap();
        assert_eq!((width, height), (4, 4));
    }

    #[test]
    fn test_prepare_engine_runs_warmup_passes() {
        let state = ControlState::new("abstract shape", "blurry", 0);
        let config = EngineConfig {
            width: 2,
            height: 2,
            warmup_passes: 5,
            ..EngineConfig::default()
        };
        let engine = prepare_engine(SyntheticEngine::new(2), &config, &state).unwrap();
        assert_eq!(engine.prepare_calls(), 1);
        assert_eq!(engine.warmup_calls(), 5);
    }

    #[test]
    fn test_run_exits_on_shutdown_and_closes_ports() {
        let f = fixture();
        let state = Arc::clone(&f.state);
        let hub = f.hub.clone();

        let handle = std::thread::spawn(move || f.worker.run());

        // Worker enables output at loop entry.
        publish_frame(&hub);
        state.trigger.raise();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while hub.published_count("out") == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(hub.published_count("out"), 1);

        state.shutdown.set();
        let frames = handle.join().unwrap();
        assert_eq!(frames, 1);
    }
}
