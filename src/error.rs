//! Error types shared by the codec, the statistics worker and configuration loading

use thiserror::Error;

/// Result alias for telegram decoding
pub type DecodeResult<T> = Result<T, FormatError>;

/// A telegram could not be decoded. Fatal to the one decode call only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Fewer than `required` bytes are available from `offset`
    #[error("telegram needs {required} bytes from offset {offset}, buffer holds {len}")]
    Truncated {
        offset: usize,
        len: usize,
        required: usize,
    },

    /// Hex record contained a non-hex character or an odd digit count
    #[error("invalid hex telegram: {0}")]
    InvalidHex(String),

    /// Hex record decoded to the wrong number of bytes
    #[error("telegram record must be {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

impl From<hex::FromHexError> for FormatError {
    fn from(err: hex::FromHexError) -> Self {
        FormatError::InvalidHex(err.to_string())
    }
}

/// A statistics recomputation did not produce a result.
///
/// Delivered to the consumer as a failed completion, never returned from `submit`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// The computation returned an error
    #[error("statistics computation failed: {0}")]
    Failed(String),

    /// The computation panicked
    #[error("statistics computation panicked: {0}")]
    Panicked(String),

    /// The blocking task was cancelled by the runtime shutting down
    #[error("statistics computation was cancelled")]
    Cancelled,
}

/// Configuration values that could not be used
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{key} is not a valid number: '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("wind speed domain is empty: min {min} must be below max {max}")]
    EmptySpeedDomain { min: f64, max: f64 },

    #[error("{key} must be greater than zero")]
    ZeroBins { key: &'static str },
}
