//! Error types for the generation engine.

use thiserror::Error;

/// Errors raised by a generation engine.
///
/// Startup errors (`Initialization`) abort the process before the
/// worker loop begins. Everything else is contained at per-iteration
/// granularity by the worker.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Model loading / preparation failed. Fatal at startup.
    #[error("engine initialization failed: {0}")]
    Initialization(String),

    /// Encoding a prompt failed; the previous prompt stays in effect.
    #[error("failed to encode prompt '{prompt}': {reason}")]
    PromptEncoding { prompt: String, reason: String },

    /// A preprocessing or inference pass failed; the frame is dropped.
    #[error("inference failed: {0}")]
    Inference(String),
}
