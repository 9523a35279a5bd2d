// Timelapse scheduling error types and result aliases

use std::path::PathBuf;

use thiserror::Error;

/// Result type for timelapse operations
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Errors from artifact discovery and schedule computation
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// No artifact survived filtering
    #[error("No artifacts to schedule: {bound}")]
    NoArtifacts { bound: String },

    /// Maximum output rate was zero, negative or not finite
    #[error("Invalid maximum output rate {0}: must be positive and finite")]
    InvalidOutputRate(f64),

    /// Real gap compressed by the ratio does not fit a display duration
    #[error("Display duration of {gap_secs} s for {artifact} is out of range; the speedup ratio is too small")]
    DurationOverflow { artifact: PathBuf, gap_secs: f64 },

    /// Input root missing or not a directory
    #[error("Input directory error for {path}: {reason}")]
    InputDirectory { path: PathBuf, reason: String },

    /// Directory traversal failed part way
    #[error("Artifact scan failed: {0}")]
    ScanFailed(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScheduleError {
    /// Create a no-artifacts error describing the bound that emptied the set
    pub fn no_artifacts(bound: impl Into<String>) -> Self {
        Self::NoArtifacts {
            bound: bound.into(),
        }
    }

    /// Create an input directory error
    pub fn input_directory(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InputDirectory {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
