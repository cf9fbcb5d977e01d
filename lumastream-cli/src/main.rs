//! LumaStream CLI - Command-line interface
//!
//! This binary runs the LumaStream generation pipeline: an OSC command
//! listener plus a frame generation worker, wired over the in-process
//! loopback frame hub.

mod error;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::info;

use lumastream::control::ControlState;
use lumastream::engine::{parse_lora_pairs, Acceleration, EngineConfig, SyntheticEngine};
use lumastream::frame::LoopbackHub;
use lumastream::logging::{default_log_dir, default_log_file, init_logging};
use lumastream::service::{FrameSettings, OscSettings, PipelineService, ServiceConfig};

use error::CliError;

const DEFAULT_PROMPT: &str = "abstract shape";
const DEFAULT_NEGATIVE_PROMPT: &str = "low quality, bad quality, blurry, low resolution";

#[derive(Debug, Clone, ValueEnum)]
enum AccelerationArg {
    /// No acceleration
    None,
    /// Memory-efficient attention
    Xformers,
    /// Compiled TensorRT engine
    Tensorrt,
}

impl From<AccelerationArg> for Acceleration {
    fn from(arg: AccelerationArg) -> Self {
        match arg {
            AccelerationArg::None => Acceleration::None,
            AccelerationArg::Xformers => Acceleration::Xformers,
            AccelerationArg::Tensorrt => Acceleration::TensorRt,
        }
    }
}

#[derive(Parser)]
#[command(name = "lumastream")]
#[command(about = "Real-time generative image pipeline", long_about = None)]
struct Args {
    /// Address the OSC command listener binds to
    #[arg(long, default_value = "127.0.0.1")]
    osc_ip: IpAddr,

    /// Port the OSC command listener binds to
    #[arg(long, default_value = "7000")]
    osc_port: u16,

    /// Name of the inbound frame channel
    #[arg(long, default_value = "SourceImage")]
    frame_in: String,

    /// Name of the outbound frame channel
    #[arg(long, default_value = "LumaStream")]
    frame_out: String,

    /// Model identifier or filesystem path
    #[arg(long, default_value = "stabilityai/sd-turbo")]
    model: String,

    /// Comma-separated LoRA overrides, e.g. "detail:0.5,style:0.7"
    #[arg(long)]
    lora: Option<String>,

    /// Frame width in pixels
    #[arg(long, default_value = "512")]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value = "512")]
    height: u32,

    /// Acceleration backend
    #[arg(long, value_enum, default_value = "xformers")]
    acceleration: AccelerationArg,

    /// Delta multiplier for the virtual residual noise
    #[arg(long, default_value = "0.5")]
    delta: f32,

    /// Console verbosity level (0 = silent, 3 = per-frame detail)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(0..=3))]
    verbose: u8,

    /// Silence console reporting (same as --verbose 0)
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    if let Err(e) = run() {
        e.exit();
    }
}

fn run() -> Result<(), CliError> {
    let args = Args::parse();

    let _logging_guard = init_logging(default_log_dir(), default_log_file())
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    info!("LumaStream v{}", lumastream::VERSION);

    if args.width == 0 || args.height == 0 {
        return Err(CliError::Config(
            "frame dimensions must be non-zero".to_string(),
        ));
    }

    let config = ServiceConfig {
        osc: OscSettings {
            ip: args.osc_ip,
            port: args.osc_port,
        },
        frame: FrameSettings {
            inbound_name: args.frame_in.clone(),
            outbound_name: args.frame_out.clone(),
        },
        engine: EngineConfig {
            model: args.model.clone(),
            lora_weights: args
                .lora
                .as_deref()
                .map(parse_lora_pairs)
                .unwrap_or_default(),
            width: args.width,
            height: args.height,
            acceleration: args.acceleration.clone().into(),
            delta: args.delta,
            ..EngineConfig::default()
        },
        ..ServiceConfig::default()
    };

    let verbosity = if args.quiet { 0 } else { args.verbose };
    let state = Arc::new(ControlState::new(
        DEFAULT_PROMPT,
        DEFAULT_NEGATIVE_PROMPT,
        verbosity,
    ));

    let shutdown_state = Arc::clone(&state);
    ctrlc::set_handler(move || {
        shutdown_state.shutdown.set();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let hub = LoopbackHub::new();
    let engine = SyntheticEngine::new(config.engine.seed);

    let mut service = PipelineService::start(&config, engine, Arc::new(hub), Arc::clone(&state))?;

    println!(
        "LumaStream running (OSC on {}:{}, frames {} -> {}).",
        args.osc_ip,
        service.osc_port(),
        args.frame_in,
        args.frame_out
    );
    println!("Press Ctrl+C to stop.");

    while !state.shutdown.is_set() && service.is_running() {
        std::thread::sleep(Duration::from_millis(100));
    }

    service.shutdown();
    let frames = service.join();
    println!("Stopped after {} frames.", frames);
    Ok(())
}
