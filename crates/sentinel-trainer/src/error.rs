use thiserror::Error;

/// Errors raised while training or exporting a model.
#[derive(Debug, Error)]
pub enum TrainerError {
    /// Data preparation failed.
    #[error(transparent)]
    Core(#[from] sentinel_core::SentinelError),

    /// Candle ML framework error.
    #[error("ML framework error: {0}")]
    Candle(#[from] candle_core::Error),

    /// The artifact could not be serialized or parsed.
    #[error("artifact format error: {0}")]
    Artifact(#[from] safetensors::SafeTensorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The shared parameter map was poisoned by a panicking thread.
    #[error("parameter store lock poisoned")]
    PoisonedParameters,

    /// Training was asked to run on a split with no rows.
    #[error("no training examples left after holding out {held_out} for validation")]
    NoTrainingRows {
        /// Rows reserved for validation.
        held_out: usize,
    },
}

/// Result type alias for trainer operations.
pub type Result<T> = std::result::Result<T, TrainerError>;
