// Smart Device Management error types and result aliases

use std::path::PathBuf;

use thiserror::Error;

/// Result type for SDM operations
pub type SdmResult<T> = Result<T, SdmError>;

/// Errors from credential handling and the device API
#[derive(Debug, Error)]
pub enum SdmError {
    /// Client secrets file missing or malformed
    #[error("Failed to load credentials from {path}: {reason}")]
    Credentials { path: PathBuf, reason: String },

    /// Token cache could not be read or written
    #[error("Token store error for {path}: {reason}")]
    TokenStore { path: PathBuf, reason: String },

    /// The refresh token was revoked or expired
    #[error("Refresh token rejected (invalid_grant): {0}")]
    InvalidGrant(String),

    /// Authorization code flow failed
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// Transport level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the API
    #[error("API request to {endpoint} failed with status {status}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Enterprise id was empty
    #[error("Enterprise ID is required")]
    MissingEnterpriseId,

    /// Device listing was empty
    #[error("No devices found in enterprise {0}")]
    NoDevices(String),

    /// No device of the camera type
    #[error("No camera found in device list ({count} devices checked)")]
    NoCamera { count: usize },

    /// Response body did not have the expected shape
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdmError {
    /// Create a credentials error
    pub fn credentials(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Credentials {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a token store error
    pub fn token_store(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::TokenStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an authorization error
    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    /// Create an invalid response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}
