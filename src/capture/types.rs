// Capture session data types

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use super::error::CaptureError;

/// Controller state machine tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Negotiating,
    Connected,
    Recording,
    Closing,
    Closed,
    Failed,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Negotiating => "negotiating",
            Self::Connected => "connected",
            Self::Recording => "recording",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Connection state reported by the peer session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl PeerState {
    /// States from which the connection can no longer carry media
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Kind of an incoming media track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Unknown,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Bounds for every wait point of a capture session
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Address gathering bound during negotiation
    pub gather_timeout: Duration,
    /// Bound for reaching the connected state
    pub connect_timeout: Duration,
    /// Length of the recording window
    pub record_duration: Duration,
    /// Bound for reaching the closed state
    pub close_timeout: Duration,
    /// Bound for the media consumer to deliver its buffer
    pub collect_timeout: Duration,
    /// Connection state polling interval
    pub poll_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            gather_timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(30),
            record_duration: Duration::from_secs(5),
            close_timeout: Duration::from_secs(30),
            collect_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Result of a successful capture run
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    /// Annex-B H.264 byte stream
    pub buffer: Bytes,
    /// Advisory failures that did not prevent the capture
    pub warnings: Vec<CaptureError>,
}
