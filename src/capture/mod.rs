// Remote camera capture
//
// Drives one time-bounded WebRTC session against a camera and returns the
// raw H.264 stream it delivered. The negotiation, media and signalling
// collaborators sit behind traits so the controller can run against the
// `webrtc` crate in production and against fakes in tests.

pub mod consumer;
pub mod error;
pub mod peer;
pub mod session;
pub mod types;

pub use consumer::{spawn_consumer, H264_MIME_TYPE};
pub use error::{CaptureError, CaptureResult};
pub use session::CaptureSession;
pub use types::*;
pub use peer::{PeerConfig, WebRtcPeerSession};

use async_trait::async_trait;
use webrtc::rtp::packet::Packet;
use tokio::sync::mpsc;

/// Fires once local address gathering has completed
pub type GatherSignal = mpsc::Receiver<()>;

/// Channel carrying incoming tracks from the peer session to the consumer
pub type TrackSender = mpsc::UnboundedSender<Box<dyn MediaTrack>>;
pub type TrackReceiver = mpsc::UnboundedReceiver<Box<dyn MediaTrack>>;

/// Negotiation collaborator: one local peer connection
#[async_trait]
pub trait PeerSession: Send + Sync {
    /// Build the local offer, install it, and return the gathering signal
    async fn create_local_offer(&self) -> CaptureResult<GatherSignal>;

    /// Local description including gathered candidates
    async fn local_description(&self) -> CaptureResult<String>;

    /// Apply the remote answer
    async fn apply_remote_answer(&self, sdp: String) -> CaptureResult<()>;

    /// Current connection state
    fn connection_state(&self) -> PeerState;

    /// Start closing; the state eventually becomes `Closed`
    async fn close(&self) -> CaptureResult<()>;
}

/// Relays a local offer to the remote device and returns its answer
#[async_trait]
pub trait AnswerExchanger: Send + Sync {
    async fn exchange(&self, offer_sdp: &str) -> crate::Result<String>;
}

/// Media stream collaborator: one incoming track
#[async_trait]
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> String;

    fn kind(&self) -> MediaKind;

    /// Codec MIME type, e.g. `video/H264`
    fn mime_type(&self) -> String;

    /// Next RTP packet, or `None` at end of stream
    async fn read_packet(&self) -> Option<Packet>;
}
