//! # Variant Presets
//!
//! The full, small and tiny pipelines differ only in numbers. Every one of
//! those numbers lives in [`VariantConfig`]; [`Variant::config`] returns the
//! named preset.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SentinelError};

/// Width of an encoded input sequence, shared by every variant.
pub const MAX_INPUT_LENGTH: usize = 200;

/// Width of an encoded label sequence, shared by every variant.
pub const MAX_LABEL_LENGTH: usize = 50;

/// Fixed destination of the exported artifact, relative to the working directory.
pub const DEFAULT_ARTIFACT_PATH: &str = "app/src/main/assets/models/contact_detection_model.tflite";

/// Named configuration preset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// 30000-symbol vocabulary, three hidden layers with dropout.
    #[default]
    Full,
    /// 256-symbol vocabulary, two hidden layers with dropout.
    Small,
    /// 128-symbol vocabulary, two hidden layers, no dropout.
    Tiny,
}

impl Variant {
    /// All presets, largest first.
    pub const ALL: [Variant; 3] = [Variant::Full, Variant::Small, Variant::Tiny];

    /// Returns the preset configuration for this variant.
    #[must_use]
    pub fn config(self) -> VariantConfig {
        match self {
            Self::Full => VariantConfig {
                variant: self,
                model_name: "contact_detection_model".into(),
                vocab_size: 30_000,
                max_input_len: MAX_INPUT_LENGTH,
                max_label_len: MAX_LABEL_LENGTH,
                hidden: vec![
                    DenseSpec::new(256, Some(0.2)),
                    DenseSpec::new(128, Some(0.2)),
                    DenseSpec::new(64, Some(0.1)),
                ],
                synthetic_examples: 50,
                epochs: 10,
                batch_size: 8,
                validation_split: 0.2,
                learning_rate: 1e-3,
                quantization: Quantization::Int8,
            },
            Self::Small => VariantConfig {
                variant: self,
                model_name: "small_contact_detection_model".into(),
                vocab_size: 256,
                max_input_len: MAX_INPUT_LENGTH,
                max_label_len: MAX_LABEL_LENGTH,
                hidden: vec![DenseSpec::new(64, Some(0.1)), DenseSpec::new(32, Some(0.1))],
                synthetic_examples: 20,
                epochs: 5,
                batch_size: 4,
                validation_split: 0.2,
                learning_rate: 1e-3,
                quantization: Quantization::Float16,
            },
            Self::Tiny => VariantConfig {
                variant: self,
                model_name: "tiny_contact_detection_model".into(),
                vocab_size: 128,
                max_input_len: MAX_INPUT_LENGTH,
                max_label_len: MAX_LABEL_LENGTH,
                hidden: vec![DenseSpec::new(32, None), DenseSpec::new(16, None)],
                synthetic_examples: 10,
                epochs: 3,
                batch_size: 2,
                validation_split: 0.2,
                learning_rate: 1e-3,
                quantization: Quantization::Float16,
            },
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Small => "small",
            Self::Tiny => "tiny",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "small" => Ok(Self::Small),
            "tiny" => Ok(Self::Tiny),
            _ => Err(SentinelError::UnknownVariant { name: s.to_string() }),
        }
    }
}

/// How exported weights are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantization {
    /// Symmetric per-tensor 8-bit weights with a float scale; biases stay `f32`.
    Int8,
    /// Every tensor stored as IEEE half precision.
    Float16,
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int8 => write!(f, "int8"),
            Self::Float16 => write!(f, "float16"),
        }
    }
}

/// One hidden fully-connected stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DenseSpec {
    /// Output width of the stage.
    pub units: usize,
    /// Drop probability applied after the activation, if any.
    #[serde(default)]
    pub dropout: Option<f32>,
}

impl DenseSpec {
    pub fn new(units: usize, dropout: Option<f32>) -> Self {
        Self { units, dropout }
    }
}

/// Every numeric parameter of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Preset this configuration derives from; selects the example templates.
    pub variant: Variant,
    /// Name reported in the model summary.
    pub model_name: String,
    /// Number of distinct codes the encoder may emit.
    pub vocab_size: usize,
    pub max_input_len: usize,
    pub max_label_len: usize,
    /// Hidden stages in order, input side first.
    pub hidden: Vec<DenseSpec>,
    /// Number of generated examples appended to the hand-written list.
    pub synthetic_examples: usize,
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of examples held out from the tail for validation.
    pub validation_split: f64,
    pub learning_rate: f64,
    pub quantization: Quantization,
}

impl VariantConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Largest code the encoder emits: `vocab_size - 1`.
    #[must_use]
    pub fn max_code(&self) -> u32 {
        self.vocab_size.saturating_sub(1) as u32
    }

    /// Width of the flat output layer before reshaping.
    #[must_use]
    pub fn output_width(&self) -> usize {
        self.max_label_len * self.vocab_size
    }

    /// Check that the configuration describes a trainable network.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 || self.vocab_size > u32::MAX as usize {
            return Err(SentinelError::InvalidConfig(format!(
                "vocab_size must be in 1..={}, got {}",
                u32::MAX,
                self.vocab_size
            )));
        }
        if self.max_input_len == 0 || self.max_label_len == 0 {
            return Err(SentinelError::InvalidConfig(
                "sequence lengths must be non-zero".into(),
            ));
        }
        if self.epochs == 0 || self.batch_size == 0 {
            return Err(SentinelError::InvalidConfig(
                "epochs and batch_size must be non-zero".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(SentinelError::InvalidConfig(format!(
                "validation_split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        if self.learning_rate <= 0.0 {
            return Err(SentinelError::InvalidConfig(
                "learning_rate must be positive".into(),
            ));
        }
        for (i, layer) in self.hidden.iter().enumerate() {
            if layer.units == 0 {
                return Err(SentinelError::InvalidConfig(format!(
                    "hidden layer {} has zero units",
                    i + 1
                )));
            }
            if let Some(p) = layer.dropout {
                if !(0.0..1.0).contains(&p) {
                    return Err(SentinelError::InvalidConfig(format!(
                        "hidden layer {} dropout must be in [0, 1), got {p}",
                        i + 1
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for VariantConfig {
    fn default() -> Self {
        Variant::default().config()
    }
}
