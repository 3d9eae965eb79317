//! Error types for forecast-dl
//!
//! Per-target fetch failures are carried as data inside [`crate::types::FetchResult`]
//! and end up as report rows; they never surface through this type. `Error` covers
//! the failures that legitimately abort an operation: client construction, report
//! persistence, metadata decoding, and configuration mistakes.

use thiserror::Error;

/// Result type alias for forecast-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for forecast-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "tiles.zoom")
        key: Option<String>,
    },

    /// Network error (HTTP client construction or a non-recoverable request failure)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (report persistence, destination directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (snapshot metadata, artifact envelopes)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot metadata could not be fetched
    ///
    /// The tile pipeline treats this as an abandon signal rather than a hard
    /// failure; the variant exists so the reason still reaches the logs.
    #[error("snapshot metadata unavailable: {reason}")]
    Metadata {
        /// Why the metadata request produced no usable payload
        reason: String,
    },

    /// The snapshot frame set has an unexpected size
    ///
    /// A radar snapshot always carries one observation plus six nowcast frames.
    /// Any other count means the remote feed changed shape and tile bucketing
    /// would silently produce wrong paths, so the run fails instead.
    #[error("expected {expected} snapshot frames, got {actual}")]
    FrameCount {
        /// The number of frames a well-formed snapshot carries
        expected: usize,
        /// The number of frames actually present in the metadata
        actual: usize,
    },
}

impl Error {
    /// Short machine-readable label for report rows and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config { .. } => "ConfigError",
            Error::Network(_) => "NetworkError",
            Error::Io(_) => "IoError",
            Error::Serialization(_) => "SerializationError",
            Error::Metadata { .. } => "MetadataError",
            Error::FrameCount { .. } => "FrameCountError",
        }
    }
}
