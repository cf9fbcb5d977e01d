//! Generation engine contract.
//!
//! The generation model is an external collaborator. This module
//! defines the narrow trait the worker drives it through, the
//! configuration resolved at startup, the prompt-encoding cache, and a
//! deterministic [`SyntheticEngine`] used by the tests and the CLI's
//! self-contained mode.

mod config;
mod error;
mod prompt_cache;
mod synthetic;
mod traits;

pub use config::{parse_lora_pairs, Acceleration, EngineConfig, LoraWeight};
pub use error::EngineError;
pub use prompt_cache::{PromptCache, PROMPT_CACHE_CAPACITY};
pub use synthetic::SyntheticEngine;
pub use traits::{FrameTensor, GenerationEngine, PromptEmbedding};
