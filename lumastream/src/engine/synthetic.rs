//! Deterministic engine implementation.
//!
//! Stands in for a real diffusion backend in tests and in the CLI's
//! self-contained mode. Prompt encodings are stable hashes of the
//! text, inference tints the input frame with a color derived from the
//! active embedding, and every contract call is counted so tests can
//! assert exactly what the worker drove.

use image::{Rgba, RgbaImage};

use super::error::EngineError;
use super::traits::{FrameTensor, GenerationEngine, PromptEmbedding};

/// Embedding width produced by [`SyntheticEngine::encode_prompt`].
const EMBEDDING_LEN: usize = 8;

/// Deterministic, dependency-free generation engine.
pub struct SyntheticEngine {
    seed: u64,
    prepared: bool,
    noise_scale: f32,
    active_embedding: Option<PromptEmbedding>,

    prepare_calls: u32,
    warmup_calls: u32,
    encode_calls: u32,
    apply_calls: u32,
    infer_calls: u32,

    fail_next_encode: bool,
    fail_next_infer: bool,
}

impl SyntheticEngine {
    /// Create an engine with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            prepared: false,
            noise_scale: 1.0,
            active_embedding: None,
            prepare_calls: 0,
            warmup_calls: 0,
            encode_calls: 0,
            apply_calls: 0,
            infer_calls: 0,
            fail_next_encode: false,
            fail_next_infer: false,
        }
    }

    /// Make the next `encode_prompt` call fail (error-path testing).
    pub fn fail_next_encode(&mut self) {
        self.fail_next_encode = true;
    }

    /// Make the next `infer` call fail (error-path testing).
    pub fn fail_next_infer(&mut self) {
        self.fail_next_infer = true;
    }

    pub fn prepare_calls(&self) -> u32 {
        self.prepare_calls
    }

    pub fn warmup_calls(&self) -> u32 {
        self.warmup_calls
    }

    pub fn encode_calls(&self) -> u32 {
        self.encode_calls
    }

    pub fn apply_calls(&self) -> u32 {
        self.apply_calls
    }

    pub fn infer_calls(&self) -> u32 {
        self.infer_calls
    }

    /// Current noise scale (starts at 1.0, multiplied per update).
    pub fn noise_scale(&self) -> f32 {
        self.noise_scale
    }

    /// The embedding most recently applied, if any.
    pub fn active_embedding(&self) -> Option<&PromptEmbedding> {
        self.active_embedding.as_ref()
    }

    fn hash_text(&self, text: &str) -> u64 {
        // FNV-1a folded with the seed; stable across runs.
        let mut hash = 0xcbf29ce484222325u64 ^ self.seed;
        for byte in text.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }

    fn embedding_for(&self, prompt: &str, negative_prompt: &str) -> PromptEmbedding {
        let hash = self.hash_text(&format!("{prompt}||{negative_prompt}"));
        let values = (0..EMBEDDING_LEN)
            .map(|i| {
                let byte = (hash >> (i * 8)) & 0xff;
                byte as f32 / 255.0
            })
            .collect();
        PromptEmbedding { values }
    }

    fn tint(&self) -> [u8; 3] {
        match &self.active_embedding {
            Some(embedding) => {
                let pick = |i: usize| (embedding.values[i % embedding.values.len()] * 255.0) as u8;
                [pick(0), pick(1), pick(2)]
            }
            None => [0, 0, 0],
        }
    }
}

impl GenerationEngine for SyntheticEngine {
    fn prepare(
        &mut self,
        prompt: &str,
        negative_prompt: &str,
        _steps: u32,
        _guidance_scale: f32,
        _delta: f32,
    ) -> Result<(), EngineError> {
        if prompt.is_empty() && negative_prompt.is_empty() {
            return Err(EngineError::Initialization(
                "cannot prepare with empty prompts".to_string(),
            ));
        }
        self.prepare_calls += 1;
        self.prepared = true;
        self.active_embedding = Some(self.embedding_for(prompt, negative_prompt));
        Ok(())
    }

    fn warmup(&mut self, image: &RgbaImage) -> Result<(), EngineError> {
        self.warmup_calls += 1;
        let tensor = self.preprocess(image)?;
        self.infer(tensor)?;
        Ok(())
    }

    fn encode_prompt(
        &mut self,
        prompt: &str,
        negative_prompt: &str,
    ) -> Result<PromptEmbedding, EngineError> {
        if self.fail_next_encode {
            self.fail_next_encode = false;
            return Err(EngineError::PromptEncoding {
                prompt: prompt.to_string(),
                reason: "injected encode failure".to_string(),
            });
        }
        self.encode_calls += 1;
        Ok(self.embedding_for(prompt, negative_prompt))
    }

    fn apply_embedding(&mut self, embedding: &PromptEmbedding) -> Result<(), EngineError> {
        self.apply_calls += 1;
        self.active_embedding = Some(embedding.clone());
        Ok(())
    }

    fn scale_noise(&mut self, delta: f32) {
        self.noise_scale *= delta;
    }

    fn preprocess(&mut self, image: &RgbaImage) -> Result<FrameTensor, EngineError> {
        Ok(FrameTensor {
            width: image.width(),
            height: image.height(),
            data: image.as_raw().iter().map(|&b| b as f32 / 255.0).collect(),
        })
    }

    fn infer(&mut self, tensor: FrameTensor) -> Result<RgbaImage, EngineError> {
        if self.fail_next_infer {
            self.fail_next_infer = false;
            return Err(EngineError::Inference("injected infer failure".to_string()));
        }
        if !self.prepared {
            return Err(EngineError::Inference("engine not prepared".to_string()));
        }
        self.infer_calls += 1;

        let tint = self.tint();
        let mut output = RgbaImage::new(tensor.width, tensor.height);
        for (x, y, pixel) in output.enumerate_pixels_mut() {
            let idx = ((y * tensor.width + x) * 4) as usize;
            let channel = |offset: usize, tint: u8| {
                let input = (tensor.data[idx + offset] * 255.0) as u16;
                (((input + u16::from(tint)) / 2) & 0xff) as u8
            };
            *pixel = Rgba([
                channel(0, tint[0]),
                channel(1, tint[1]),
                channel(2, tint[2]),
                255,
            ]);
        }
        Ok(output)
    }
}
