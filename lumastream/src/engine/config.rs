//! Engine configuration resolved once at startup.

use std::str::FromStr;

use tracing::warn;

/// Acceleration backend selector, passed through to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Acceleration {
    /// No acceleration.
    None,
    /// Memory-efficient attention.
    #[default]
    Xformers,
    /// Compiled TensorRT engine.
    TensorRt,
}

impl FromStr for Acceleration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Acceleration::None),
            "xformers" => Ok(Acceleration::Xformers),
            "tensorrt" => Ok(Acceleration::TensorRt),
            other => Err(format!(
                "unknown acceleration '{other}' (expected none, xformers, or tensorrt)"
            )),
        }
    }
}

/// A LoRA weight override.
#[derive(Debug, Clone, PartialEq)]
pub struct LoraWeight {
    pub name: String,
    pub scale: f32,
}

/// Generation engine configuration.
///
/// Resolved from process inputs at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Model identifier or filesystem path.
    pub model: String,
    /// LoRA weight overrides.
    pub lora_weights: Vec<LoraWeight>,
    /// Target frame width.
    pub width: u32,
    /// Target frame height.
    pub height: u32,
    /// Acceleration backend.
    pub acceleration: Acceleration,
    /// Inference steps for the sampling schedule.
    pub inference_steps: u32,
    /// Classifier-free guidance scale.
    pub guidance_scale: f32,
    /// Delta multiplier for the virtual residual noise.
    pub delta: f32,
    /// Random seed.
    pub seed: u64,
    /// Warmup passes before serving real frames.
    pub warmup_passes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "stabilityai/sd-turbo".to_string(),
            lora_weights: Vec::new(),
            width: 512,
            height: 512,
            acceleration: Acceleration::default(),
            inference_steps: 50,
            guidance_scale: 1.2,
            delta: 0.5,
            seed: 2,
            warmup_passes: 5,
        }
    }
}

/// Parse a comma-separated `name:scale` list of LoRA overrides.
///
/// Pairs with an unparseable scale are skipped with a warning rather
/// than failing startup.
pub fn parse_lora_pairs(input: &str) -> Vec<LoraWeight> {
    let mut weights = Vec::new();
    for pair in input.split(',') {
        let Some((name, scale)) = pair.split_once(':') else {
            continue;
        };
        let name = name.trim();
        match scale.trim().parse::<f32>() {
            Ok(scale) => weights.push(LoraWeight {
                name: name.to_string(),
                scale,
            }),
            Err(_) => {
                warn!(name, scale = scale.trim(), "invalid LoRA scale, skipping");
            }
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lora_pairs() {
        let weights = parse_lora_pairs("detail:0.5, style:0.7");
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].name, "detail");
        assert!((weights[0].scale - 0.5).abs() < f32::EPSILON);
        assert_eq!(weights[1].name, "style");
    }

    #[test]
    fn test_parse_lora_skips_invalid_scale() {
        let weights = parse_lora_pairs("good:0.3,bad:abc,noseparator");
        assert_eq!(weights.len(), 1);
        assert_eq!(weights[0].name, "good");
    }

    #[test]
    fn test_parse_lora_empty_input() {
        assert!(parse_lora_pairs("").is_empty());
    }

    #[test]
    fn test_acceleration_from_str() {
        assert_eq!(
            "xformers".parse::<Acceleration>().unwrap(),
            Acceleration::Xformers
        );
        assert_eq!(
            "TensorRT".parse::<Acceleration>().unwrap(),
            Acceleration::TensorRt
        );
        assert!("cuda".parse::<Acceleration>().is_err());
    }

    #[test]
    fn test_defaults_match_service_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.inference_steps, 50);
        assert!((config.guidance_scale - 1.2).abs() < f32::EPSILON);
        assert!((config.delta - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.warmup_passes, 5);
        assert_eq!((config.width, config.height), (512, 512));
    }
}
