//! # Sentinel Core
//!
//! Data preparation for the Sentinel contact-name model: variant presets,
//! the fixed-width character encoder, the synthetic example generator and
//! the dataset builder. Nothing here depends on the ML framework.
//!
//! ## Quick Start
//!
//! ```rust
//! use sentinel_core::{Dataset, ExampleGenerator, Variant};
//!
//! let config = Variant::Tiny.config();
//! let mut rng = oorandom::Rand32::new(42);
//! let examples = ExampleGenerator::from_config(&config).generate(&mut rng);
//! let dataset = Dataset::build(&examples, &config).unwrap();
//!
//! assert_eq!(dataset.input_shape(), (15, 200));
//! assert_eq!(dataset.label_shape(), (15, 50));
//! ```
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod encoder;
pub mod error;

// Re-export primary API
pub use config::{
    DEFAULT_ARTIFACT_PATH, DenseSpec, MAX_INPUT_LENGTH, MAX_LABEL_LENGTH, Quantization, Variant,
    VariantConfig,
};
pub use corpus::{Example, ExampleGenerator, RandomSource};
pub use dataset::Dataset;
pub use encoder::{TextEncoder, decode, encode};
pub use error::{Result, SentinelError};
