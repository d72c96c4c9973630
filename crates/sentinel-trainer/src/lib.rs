//! # Sentinel Trainer
//!
//! Builds, trains and exports the contact-name model. One call to [`run`]
//! executes the whole pipeline: generate examples, encode them, fit the
//! network, write the quantized artifact.

pub mod data;
pub mod error;
pub mod export;
pub mod model;
pub mod trainer;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use candle_core::Device;
use sentinel_core::{DEFAULT_ARTIFACT_PATH, Dataset, ExampleGenerator, Variant, VariantConfig};
use serde::Serialize;
use tracing::info;

pub use error::{Result, TrainerError};
pub use export::{ArtifactInfo, ExportReport, export, inspect_artifact, load_artifact, load_model};
pub use model::{ContactModel, ModelSummary};
pub use trainer::{EpochMetrics, History, Metrics, Trainer, predict_labels};

/// Settings for one pipeline invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub variant: Variant,
    /// JSON [`VariantConfig`] replacing the preset, if given.
    pub config_file: Option<PathBuf>,
    /// Where the artifact is written.
    pub output: PathBuf,
    /// Seed for example generation and shuffling; drawn from the clock when absent.
    pub seed: Option<u64>,
    /// Where to write a JSON [`RunReport`], if anywhere.
    pub report: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            config_file: None,
            output: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            seed: None,
            report: None,
        }
    }

    /// The preset for `variant`, or the contents of `config_file`.
    pub fn resolve(&self) -> Result<VariantConfig> {
        let config = match &self.config_file {
            Some(path) => VariantConfig::from_json_file(path)?,
            None => self.variant.config(),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(Variant::default())
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub variant: Variant,
    pub seed: u64,
    pub examples: usize,
    pub input_shape: (usize, usize),
    pub label_shape: (usize, usize),
    pub summary: ModelSummary,
    pub history: History,
    pub export: ExportReport,
}

/// Execute the pipeline once, end to end.
pub fn run(run_config: &RunConfig) -> Result<RunReport> {
    let config = run_config.resolve()?;
    let seed = run_config.seed.unwrap_or_else(clock_seed);
    info!(variant = %config.variant, seed, "Sentinel contact detection model creator");

    let device = Device::Cpu;
    let mut trainer = Trainer::new(config.clone(), device, seed.wrapping_add(1))?;
    let summary = trainer.model().summary();
    info!("Model architecture:\n{summary}");

    info!("Generating training data...");
    let mut rng = oorandom::Rand32::new(seed);
    let examples = ExampleGenerator::from_config(&config).generate(&mut rng);
    let dataset = Dataset::build(&examples, &config)?;
    let (input_shape, label_shape) = (dataset.input_shape(), dataset.label_shape());
    info!(
        "Training data shape: X=({}, {}), y=({}, {})",
        input_shape.0, input_shape.1, label_shape.0, label_shape.1
    );

    let (train, validation) = dataset.split_validation(config.validation_split)?;
    info!(
        train = train.len(),
        validation = validation.len(),
        "Training model..."
    );
    let history = trainer.fit(&train, &validation)?;

    let export = export::export(trainer.varmap(), &config, &run_config.output)?;

    let report = RunReport {
        variant: config.variant,
        seed,
        examples: examples.len(),
        input_shape,
        label_shape,
        summary,
        history,
        export,
    };

    if let Some(path) = &run_config.report {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        info!("Run report written to {}", path.display());
    }

    info!("Model creation completed successfully!");
    Ok(report)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
