use thiserror::Error;

/// Errors that can occur while preparing training data.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// The example list handed to the dataset builder was empty.
    #[error("cannot build a dataset from zero examples")]
    EmptyDataset,

    /// A variant configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An unknown variant name was supplied.
    #[error("unknown variant {name:?} (expected full, small or tiny)")]
    UnknownVariant {
        /// The rejected name.
        name: String,
    },

    /// Two arrays that must agree on shape did not.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The shape the caller required.
        expected: Vec<usize>,
        /// The shape that was supplied.
        actual: Vec<usize>,
    },

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file was not valid JSON for the expected type.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias for Sentinel core operations.
pub type Result<T> = std::result::Result<T, SentinelError>;
