//! Error handling for the proof-of-work miner
//!
//! The search itself is mostly pure arithmetic, so the taxonomy is small: bad
//! difficulty parameters are rejected up front, an exhausted nonce space is
//! surfaced instead of hanging, and codec misuse fails loudly.

use thiserror::Error;

/// Result type alias for mining operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the miner
#[derive(Error, Debug)]
pub enum Error {
    /// Difficulty outside the supported `1..=256` bit range
    #[error("Invalid difficulty: {bits} bits (expected 1..=256)")]
    InvalidDifficulty { bits: i64 },

    /// Every worker scanned its share of the nonce space without a hit
    #[error("Nonce space exhausted: no solution below {max_nonce} across {workers} workers")]
    NonceSpaceExhausted { max_nonce: i64, workers: usize },

    /// Fixed-width decoding was handed the wrong number of bytes
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The search was stopped by the caller before any worker won
    #[error("Operation was cancelled: {operation}")]
    Cancelled { operation: String },

    /// Worker failures (panicked thread, dropped task)
    #[error("Worker error: {message}")]
    Worker { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Hex decoding errors
    #[error("Hex error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid difficulty error
    pub fn invalid_difficulty(bits: i64) -> Self {
        Self::InvalidDifficulty { bits }
    }

    /// Create a nonce space exhaustion error
    pub fn exhausted(max_nonce: i64, workers: usize) -> Self {
        Self::NonceSpaceExhausted { max_nonce, workers }
    }

    /// Create an invalid length error
    pub fn invalid_length(expected: usize, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a worker error
    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidDifficulty { .. } => "difficulty",
            Error::NonceSpaceExhausted { .. } => "exhausted",
            Error::InvalidLength { .. } => "codec",
            Error::Cancelled { .. } => "cancelled",
            Error::Worker { .. } => "worker",
            Error::Config { .. } => "config",
            Error::Hex(_) => "hex",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Io(_) => "io",
        }
    }
}
