use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, NnError>;

/// Everything that can go wrong while building, training, querying or
/// persisting a network.
#[derive(Error, Debug)]
pub enum NnError {
    /// Invalid architecture or options; no valid instance can be built.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A vector or tensor did not have the width the network expects.
    #[error("shape mismatch for {what}: got {got}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    /// An activation cache that does not belong to the network's current
    /// layer layout was handed to `backward`.
    #[error("stale activation cache: {0}")]
    StaleCache(String),

    /// Empty or too-small batch or dataset.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// NaN or infinity appeared in a loss, gradient or parameter.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    #[error("model '{0}' is not registered")]
    ModelNotFound(String),

    #[error("model '{0}' has no trained network")]
    NotTrained(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl NnError {
    pub(crate) fn shape(what: &'static str, got: usize, expected: usize) -> NnError {
        NnError::ShapeMismatch { what, got, expected }
    }
}
