//! The generation engine trait and its data types.

use image::RgbaImage;

use super::error::EngineError;

/// Model-internal numeric representation of an encoded prompt pair.
///
/// Cached by the worker so repeated prompts skip the encoding cost.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptEmbedding {
    /// Encoder output values; layout is engine-specific.
    pub values: Vec<f32>,
}

/// Preprocessed frame ready for inference.
#[derive(Debug, Clone)]
pub struct FrameTensor {
    pub width: u32,
    pub height: u32,
    /// Normalized channel data in engine-specific layout.
    pub data: Vec<f32>,
}

/// Contract the worker drives the generation model through.
///
/// Call order at startup: [`prepare`](GenerationEngine::prepare), then
/// a fixed number of [`warmup`](GenerationEngine::warmup) passes on a
/// synthetic all-zero image (forces lazy allocation and graph
/// compilation before real frames arrive).
///
/// Prompt changes at runtime go through the incremental path —
/// [`encode_prompt`](GenerationEngine::encode_prompt),
/// [`apply_embedding`](GenerationEngine::apply_embedding),
/// [`scale_noise`](GenerationEngine::scale_noise) — never through a
/// fresh `prepare`: a full re-preparation resets the denoising
/// buffers and visibly corrupts the next frames.
pub trait GenerationEngine: Send {
    /// Initialize the model with the starting prompt pair and
    /// sampling parameters.
    fn prepare(
        &mut self,
        prompt: &str,
        negative_prompt: &str,
        steps: u32,
        guidance_scale: f32,
        delta: f32,
    ) -> Result<(), EngineError>;

    /// Run one synthetic inference pass to absorb one-time costs.
    fn warmup(&mut self, image: &RgbaImage) -> Result<(), EngineError>;

    /// Encode a prompt pair into an embedding.
    fn encode_prompt(
        &mut self,
        prompt: &str,
        negative_prompt: &str,
    ) -> Result<PromptEmbedding, EngineError>;

    /// Swap the active prompt embedding without resetting any other
    /// model state.
    fn apply_embedding(&mut self, embedding: &PromptEmbedding) -> Result<(), EngineError>;

    /// Rescale the internal noise state, preserving its pattern.
    fn scale_noise(&mut self, delta: f32);

    /// Convert a received frame into the engine's input layout.
    fn preprocess(&mut self, image: &RgbaImage) -> Result<FrameTensor, EngineError>;

    /// Run one img2img inference pass.
    fn infer(&mut self, tensor: FrameTensor) -> Result<RgbaImage, EngineError>;
}
