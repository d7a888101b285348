//! Error types for the loraprep pipeline.
//!
//! Errors are split into run-ending failures (missing input, output collision,
//! packaging preconditions) and per-item failures that the batch pipeline
//! recovers from by skipping the item. See [`PipelineError::is_fatal`].

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for loraprep operations.
#[derive(Error, Debug)]
pub enum PrepError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input directory is absent
    #[error("Directory not found: {0}")]
    NotFound(PathBuf),

    /// Output directory already exists and will not be reused
    #[error("Output directory already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Captioning failed for a single image
    #[error("Caption failed for {path}: {message}")]
    Caption { path: PathBuf, message: String },

    /// A hosted provider call failed. A `status_code` of 429 is a rate-limit signal.
    #[error("{message}")]
    Llm {
        message: String,
        status_code: Option<u16>,
    },

    /// An image does not have the dimensions required for packaging
    #[error("Image {path} is not {expected_width}x{expected_height} (found {width}x{height})")]
    DimensionMismatch {
        path: PathBuf,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    /// No supported images in a directory that must contain some
    #[error("No image files found in {0}")]
    EmptyDataset(PathBuf),

    /// Image decoding or encoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Zip archive creation failed
    #[error("Archive error for {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// Filesystem operation failed on a specific path
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Whether this error ends the whole run.
    ///
    /// Per-item failures (captioning, provider calls, timeouts, decoding a
    /// single image) are not fatal: the batch logs them and moves on.
    pub fn is_fatal(&self) -> bool {
        match self {
            PipelineError::NotFound(_)
            | PipelineError::AlreadyExists(_)
            | PipelineError::DimensionMismatch { .. }
            | PipelineError::EmptyDataset(_)
            | PipelineError::Archive { .. }
            | PipelineError::Io { .. } => true,
            PipelineError::Caption { .. }
            | PipelineError::Llm { .. }
            | PipelineError::Decode { .. }
            | PipelineError::Timeout { .. } => false,
        }
    }

    /// Whether a provider signalled that the caller must slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            PipelineError::Llm {
                status_code: Some(429),
                ..
            }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type alias for loraprep results.
pub type Result<T> = std::result::Result<T, PrepError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
