//! Error types for the Lumen batch pipeline.
//!
//! Errors are organized by blast radius: a [`TaskError`] is confined to one
//! image or one operation on it, while a [`BatchError`] aborts the whole run
//! before anything is dispatched.

use std::path::PathBuf;
use thiserror::Error;

use crate::operation::OperationKind;

/// Top-level error type for Lumen operations.
#[derive(Error, Debug)]
pub enum LumenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Run-aborting batch errors
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

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

/// Errors raised while resolving or running a single operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    /// Operation name is not part of the closed registry
    #[error("Unsupported operation: {name}")]
    Unsupported { name: String },

    /// A required parameter is missing, malformed, or out of domain
    #[error("Invalid parameters for {operation}: {message}")]
    InvalidParameters {
        operation: OperationKind,
        message: String,
    },

    /// A pixel buffer could not be assembled
    #[error("Buffer error in {operation}: {message}")]
    Buffer {
        operation: OperationKind,
        message: String,
    },
}

/// Failures confined to one image or one task on that image.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Input file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// The operation itself rejected its input
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// The result could not be encoded
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// The encoded result could not be written
    #[error("Write error for {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stage exceeded its deadline
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// Work was never dispatched because the batch was cancelled
    #[error("Cancelled before dispatch: {0}")]
    Cancelled(PathBuf),

    /// Worker panicked or was aborted
    #[error("Worker failed for {path}: {message}")]
    Panicked { path: PathBuf, message: String },
}

/// Whole-batch precondition failures. Nothing is dispatched when one occurs.
#[derive(Error, Debug)]
pub enum BatchError {
    /// No input images were given
    #[error("No input images given")]
    EmptyInput,

    /// No operations were requested
    #[error("No operations requested")]
    NoOperations,

    /// An operation name or its parameters failed validation
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// Output directory cannot be created or used
    #[error("Output directory {path} is unusable: {message}")]
    OutputDirectory { path: PathBuf, message: String },

    /// Two tasks would target the same output file
    #[error("Output path {path} would be written by more than one task; use source naming")]
    OutputCollision { path: PathBuf },
}

/// Convenience type alias for Lumen results.
pub type Result<T> = std::result::Result<T, LumenError>;

/// Convenience type alias for per-task results.
pub type TaskResult<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_converts_into_batch_error() {
        let err: BatchError = OperationError::Unsupported {
            name: "sharpen".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Unsupported operation: sharpen");
    }

    #[test]
    fn test_write_error_keeps_source() {
        let err = TaskError::Write {
            path: PathBuf::from("/out/blur_image.png"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("blur_image.png"));
    }
}
