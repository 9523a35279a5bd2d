// Capture session error types and result aliases

use std::time::Duration;

use thiserror::Error;

use super::types::{CaptureState, PeerState};

/// Result type for capture session operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Failures of the capture session controller.
///
/// Each message names the stage that failed; timeouts carry the bound that
/// fired.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CaptureError {
    /// Address gathering did not complete in time
    #[error("Negotiation timed out: address gathering did not complete within {timeout:?}")]
    NegotiationTimeout { timeout: Duration },

    /// The remote side did not produce a usable answer
    #[error("Negotiation rejected: {reason}")]
    NegotiationRejected { reason: String },

    /// Connection was not established in time
    #[error("Connection timed out: not connected within {timeout:?}")]
    ConnectionTimeout { timeout: Duration },

    /// Connection reached a terminal state before connecting
    #[error("Connection failed: peer reached state {state} before connecting")]
    ConnectionFailed { state: PeerState },

    /// Session dropped during the recording window
    #[error("Recording interrupted: session dropped after {elapsed:?}")]
    SessionDropped { elapsed: Duration },

    /// Session did not reach the closed state in time (advisory)
    #[error("Close timed out: session not closed within {timeout:?}")]
    CloseTimeout { timeout: Duration },

    /// The media consumer delivered nothing usable
    #[error("No media received: {reason}")]
    NoMediaReceived { reason: String },

    /// Operation called out of order
    #[error("Invalid state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: CaptureState,
    },

    /// Underlying peer connection failure
    #[error("Peer connection error: {0}")]
    Peer(String),
}

impl CaptureError {
    /// Create a negotiation rejected error
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::NegotiationRejected {
            reason: reason.into(),
        }
    }

    /// Create a no media received error
    pub fn no_media(reason: impl Into<String>) -> Self {
        Self::NoMediaReceived {
            reason: reason.into(),
        }
    }

    /// Create a peer connection error
    pub fn peer(msg: impl Into<String>) -> Self {
        Self::Peer(msg.into())
    }

    /// Advisory errors are reported but never fail an otherwise successful run
    pub fn is_advisory(&self) -> bool {
        matches!(self, Self::CloseTimeout { .. })
    }
}
