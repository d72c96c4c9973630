//! Train the contact-name model and write the quantized artifact.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sentinel_core::{DEFAULT_ARTIFACT_PATH, Variant};
use sentinel_trainer::{RunConfig, run};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train the contact detection model and export it")]
#[command(version)]
struct Cli {
    /// Preset to train
    #[arg(short, long, env = "SENTINEL_VARIANT", value_enum, default_value_t = Variant::Full)]
    variant: Variant,

    /// JSON variant configuration overriding the preset
    #[arg(short, long, env = "SENTINEL_CONFIG")]
    config: Option<PathBuf>,

    /// Artifact destination
    #[arg(short, long, env = "SENTINEL_OUTPUT", default_value = DEFAULT_ARTIFACT_PATH)]
    output: PathBuf,

    /// Seed for example generation and shuffling
    #[arg(short, long, env = "SENTINEL_SEED")]
    seed: Option<u64>,

    /// Write a JSON run report here
    #[arg(short, long, env = "SENTINEL_REPORT")]
    report: Option<PathBuf>,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        Self {
            variant: cli.variant,
            config_file: cli.config,
            output: cli.output,
            seed: cli.seed,
            report: cli.report,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let report = run(&cli.into()).context("model creation failed")?;
    println!("Model saved to: {} ({})", report.export.path.display(), report.export);
    Ok(())
}
