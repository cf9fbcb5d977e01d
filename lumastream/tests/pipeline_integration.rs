//! Integration tests for the full generation pipeline.
//!
//! These tests verify the complete command and frame flows:
//! - OSC command over UDP → shared state → worker behavior
//! - Inbound frame → generation engine → outbound frame
//! - Trigger, continuous, output gating and port restart semantics
//!
//! Run with: `cargo test --test pipeline_integration`

use std::net::UdpSocket;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lumastream::control::ControlState;
use lumastream::engine::{EngineConfig, SyntheticEngine};
use lumastream::frame::LoopbackHub;
use lumastream::service::{OscSettings, PipelineService, ServiceConfig};

const DEADLINE: Duration = Duration::from_secs(3);
const FRAME_SIZE: u32 = 2;
const FRAME_BYTES: usize = (FRAME_SIZE * FRAME_SIZE * 4) as usize;

// ============================================================================
// Test Helpers
// ============================================================================

/// OSC argument for the test-side encoder.
enum Arg<'a> {
    Str(&'a str),
    Int(i32),
}

/// Encode a minimal OSC 1.0 message datagram.
fn encode_osc(address: &str, args: &[Arg<'_>]) -> Vec<u8> {
    fn push_padded(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(s.as_bytes());
        buf.push(0);
        while buf.len() % 4 != 0 {
            buf.push(0);
        }
    }

    let mut buf = Vec::new();
    push_padded(&mut buf, address);
    let mut tags = String::from(",");
    for arg in args {
        tags.push(match arg {
            Arg::Str(_) => 's',
            Arg::Int(_) => 'i',
        });
    }
    push_padded(&mut buf, &tags);
    for arg in args {
        match arg {
            Arg::Str(s) => push_padded(&mut buf, s),
            Arg::Int(i) => buf.extend_from_slice(&i.to_be_bytes()),
        }
    }
    buf
}

struct Pipeline {
    hub: LoopbackHub,
    state: Arc<ControlState>,
    service: PipelineService,
    control: UdpSocket,
}

impl Pipeline {
    /// Start a full pipeline on ephemeral ports with a small frame size.
    fn start() -> Self {
        let config = ServiceConfig {
            osc: OscSettings {
                port: 0,
                ..OscSettings::default()
            },
            engine: EngineConfig {
                width: FRAME_SIZE,
                height: FRAME_SIZE,
                warmup_passes: 1,
                ..EngineConfig::default()
            },
            ..ServiceConfig::default()
        };

        let hub = LoopbackHub::new();
        let state = Arc::new(ControlState::new("abstract shape", "blurry", 0));
        let service = PipelineService::start(
            &config,
            SyntheticEngine::new(config.engine.seed),
            Arc::new(hub.clone()),
            Arc::clone(&state),
        )
        .expect("pipeline should start");

        let control = UdpSocket::bind("127.0.0.1:0").expect("control socket should bind");
        control
            .connect(("127.0.0.1", service.osc_port()))
            .expect("control socket should connect");

        Self {
            hub,
            state,
            service,
            control,
        }
    }

    fn send(&self, address: &str, args: &[Arg<'_>]) {
        self.control
            .send(&encode_osc(address, args))
            .expect("datagram should send");
    }

    fn publish_frame(&self, fill: u8) {
        self.hub
            .publish("SourceImage", &vec![fill; FRAME_BYTES], FRAME_SIZE, FRAME_SIZE);
    }

    /// Poll until the condition holds or the deadline passes.
    fn wait_for(&self, mut condition: impl FnMut(&Self) -> bool) -> bool {
        let deadline = Instant::now() + DEADLINE;
        while Instant::now() < deadline {
            if condition(self) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        condition(self)
    }

    fn output_count(&self) -> u64 {
        self.hub.published_count("LumaStream")
    }

    fn stop(mut self) -> u64 {
        self.service.shutdown();
        self.service.join()
    }
}

// ============================================================================
// Command Flow
// ============================================================================

#[test]
fn test_prompt_command_updates_shared_state() {
    let pipeline = Pipeline::start();

    pipeline.send(
        "/prompt",
        &[Arg::Str("neon city at night"), Arg::Str("grainy")],
    );

    assert!(pipeline.wait_for(|p| p.state.current_prompt() == "neon city at night"));
    assert_eq!(pipeline.state.current_negative_prompt(), "grainy");
    pipeline.stop();
}

#[test]
fn test_verbose_commands_over_udp() {
    let pipeline = Pipeline::start();

    pipeline.send("/verbose", &[Arg::Int(3)]);
    assert!(pipeline.wait_for(|p| p.state.verbosity() == 3));

    // Out-of-range levels are rejected.
    pipeline.send("/verbose", &[Arg::Int(7)]);
    pipeline.send("/voff", &[]);
    assert!(pipeline.wait_for(|p| p.state.verbosity() == 0));

    // Cycle wraps 0 -> 1.
    pipeline.send("/v", &[]);
    assert!(pipeline.wait_for(|p| p.state.verbosity() == 1));
    pipeline.stop();
}

#[test]
fn test_unknown_address_is_ignored() {
    let pipeline = Pipeline::start();

    pipeline.send("/does-not-exist", &[Arg::Int(1)]);
    pipeline.send("/verbose", &[Arg::Int(2)]);
    assert!(pipeline.wait_for(|p| p.state.verbosity() == 2));
    pipeline.stop();
}

// ============================================================================
// Frame Flow
// ============================================================================

#[test]
fn test_trigger_produces_exactly_one_frame() {
    let pipeline = Pipeline::start();
    assert!(pipeline.wait_for(|p| p.state.output_enabled.is_set()));

    pipeline.publish_frame(60);
    pipeline.send("/trigger", &[]);

    assert!(pipeline.wait_for(|p| p.output_count() == 1));

    // A second published frame without a new trigger goes nowhere.
    pipeline.publish_frame(70);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(pipeline.output_count(), 1);
    assert_eq!(pipeline.stop(), 1);
}

#[test]
fn test_start_and_stop_control_continuous_generation() {
    let pipeline = Pipeline::start();
    assert!(pipeline.wait_for(|p| p.state.output_enabled.is_set()));

    pipeline.send("/start", &[]);
    assert!(pipeline.wait_for(|p| p.state.continuous.is_set()));

    pipeline.publish_frame(10);
    assert!(pipeline.wait_for(|p| p.output_count() == 1));
    pipeline.publish_frame(20);
    assert!(pipeline.wait_for(|p| p.output_count() == 2));

    pipeline.send("/S", &[]);
    assert!(pipeline.wait_for(|p| !p.state.continuous.is_set()));

    pipeline.publish_frame(30);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(pipeline.output_count(), 2);
    assert_eq!(pipeline.stop(), 2);
}

#[test]
fn test_output_toggle_gates_sending_only() {
    let pipeline = Pipeline::start();
    assert!(pipeline.wait_for(|p| p.state.output_enabled.is_set()));

    pipeline.send("/P", &[]);
    assert!(pipeline.wait_for(|p| !p.state.output_enabled.is_set()));

    pipeline.send("/start", &[]);
    assert!(pipeline.wait_for(|p| p.state.continuous.is_set()));
    pipeline.publish_frame(40);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(pipeline.output_count(), 0);

    pipeline.send("/p", &[]);
    assert!(pipeline.wait_for(|p| p.state.output_enabled.is_set()));
    pipeline.publish_frame(50);
    assert!(pipeline.wait_for(|p| p.output_count() == 1));

    // Frames were generated while output was off; only sending paused.
    assert_eq!(pipeline.stop(), 2);
}

#[test]
fn test_port_restart_keeps_pipeline_alive() {
    let pipeline = Pipeline::start();
    assert!(pipeline.wait_for(|p| p.state.output_enabled.is_set()));

    pipeline.send("/x", &[]);
    assert!(pipeline.wait_for(|p| !p.state.restart_ports.is_raised()));

    pipeline.send("/start", &[]);
    pipeline.publish_frame(80);
    assert!(pipeline.wait_for(|p| p.output_count() == 1));
    pipeline.stop();
}

#[test]
fn test_resolution_change_propagates_to_output() {
    let pipeline = Pipeline::start();
    assert!(pipeline.wait_for(|p| p.state.output_enabled.is_set()));

    pipeline.send("/start", &[]);
    assert!(pipeline.wait_for(|p| p.state.continuous.is_set()));

    pipeline
        .hub
        .publish("SourceImage", &vec![90u8; 4 * 4 * 4], 4, 4);
    assert!(pipeline.wait_for(|p| p.output_count() == 1));

    let (_, width, height) = pipeline.hub.latest("LumaStream").expect("output frame");
    assert_eq!((width, height), (4, 4));
    pipeline.stop();
}
