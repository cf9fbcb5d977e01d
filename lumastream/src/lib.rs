//! LumaStream - Real-time generative image pipeline service
//!
//! This library coordinates three concerns of a live image-generation
//! pipeline:
//!
//! - An OSC-over-UDP control channel that mutates shared pipeline state
//!   ([`osc`])
//! - Named frame-exchange ports that pull frames from an external
//!   producer and push processed frames to an external consumer
//!   ([`frame`])
//! - A worker loop that feeds received frames through a generation
//!   engine and forwards the results ([`worker`])
//!
//! The generation model and the pixel-sharing transport are opaque
//! collaborators behind the [`engine::GenerationEngine`] and
//! [`frame::FrameTransport`] traits.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module wires everything together:
//!
//! ```ignore
//! use std::sync::Arc;
//! use lumastream::control::ControlState;
//! use lumastream::engine::SyntheticEngine;
//! use lumastream::frame::LoopbackHub;
//! use lumastream::service::{PipelineService, ServiceConfig};
//!
//! let config = ServiceConfig::default();
//! let state = Arc::new(ControlState::new(
//!     "abstract shape",
//!     "low quality, blurry",
//!     1,
//! ));
//! let transport = Arc::new(LoopbackHub::new());
//! let engine = SyntheticEngine::new(config.engine.seed);
//!
//! let mut service = PipelineService::start(&config, engine, transport, state)?;
//! // ... run until a termination signal ...
//! service.shutdown();
//! service.join();
//! ```

pub mod control;
pub mod engine;
pub mod frame;
pub mod logging;
pub mod osc;
pub mod service;
pub mod worker;

/// Version of the LumaStream library and CLI.
///
/// Synchronized across all workspace components via `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
