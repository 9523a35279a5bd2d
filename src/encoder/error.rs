// Encoder error types and result aliases

use std::path::PathBuf;

use thiserror::Error;

/// Result type for encoder operations
pub type EncoderResult<T> = Result<T, EncoderError>;

/// Errors from the external encoder
#[derive(Debug, Error)]
pub enum EncoderError {
    /// Encoder binary could not be started
    #[error("{program} is not installed or not runnable: {reason}")]
    NotInstalled { program: String, reason: String },

    /// Encoder ran and exited unsuccessfully
    #[error("{operation} failed ({status}): {stderr}")]
    Failed {
        operation: &'static str,
        status: String,
        stderr: String,
    },

    /// Crop range did not parse or was out of bounds
    #[error("Invalid {axis} crop range '{input}': {reason}")]
    InvalidCrop {
        axis: &'static str,
        input: String,
        reason: String,
    },

    /// Output exists and overwriting was not requested
    #[error("Output file '{}' already exists. Use -y to overwrite", .0.display())]
    OutputExists(PathBuf),

    /// Nothing to encode
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EncoderError {
    /// Create an invalid crop error
    pub fn invalid_crop(axis: &'static str, input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCrop {
            axis,
            input: input.into(),
            reason: reason.into(),
        }
    }
}
