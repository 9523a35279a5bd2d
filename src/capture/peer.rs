// WebRTC peer session backed by the `webrtc` crate

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp::packet::Packet;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::track::track_remote::TrackRemote;

use super::error::{CaptureError, CaptureResult};
use super::types::{MediaKind, PeerState};
use super::{GatherSignal, MediaTrack, PeerSession, TrackReceiver, TrackSender};

/// Data channel label the camera expects to find in the offer
pub const TRIGGER_CHANNEL_LABEL: &str = "trigger";

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Peer connection settings
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// ICE server URLs
    pub ice_servers: Vec<String>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
        }
    }
}

/// Receive-only peer connection to a camera
pub struct WebRtcPeerSession {
    peer_connection: Arc<RTCPeerConnection>,
    _trigger: Arc<RTCDataChannel>,
}

impl WebRtcPeerSession {
    /// Build the peer connection and return it with the incoming track channel
    pub async fn connect(config: &PeerConfig) -> CaptureResult<(Self, TrackReceiver)> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| CaptureError::peer(format!("Failed to register codecs: {}", e)))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| CaptureError::peer(format!("Failed to register interceptors: {}", e)))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: config.ice_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(|e| CaptureError::peer(format!("Failed to create peer connection: {}", e)))?,
        );

        for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
            peer_connection
                .add_transceiver_from_kind(
                    kind,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await
                .map_err(|e| CaptureError::peer(format!("Failed to add {} transceiver: {}", kind, e)))?;
        }

        let trigger = create_trigger_channel(&peer_connection).await?;

        peer_connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                Box::pin(async move {
                    log::info!("Peer connection state changed: {}", state);
                })
            },
        ));

        let (track_tx, track_rx): (TrackSender, TrackReceiver) = mpsc::unbounded_channel();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let track_tx = track_tx.clone();
            Box::pin(async move {
                if track_tx.send(Box::new(WebRtcTrack(track))).is_err() {
                    log::debug!("Track arrived after the consumer finished");
                }
            })
        }));

        Ok((
            Self {
                peer_connection,
                _trigger: trigger,
            },
            track_rx,
        ))
    }
}

async fn create_trigger_channel(
    peer_connection: &RTCPeerConnection,
) -> CaptureResult<Arc<RTCDataChannel>> {
    let channel = peer_connection
        .create_data_channel(TRIGGER_CHANNEL_LABEL, None)
        .await
        .map_err(|e| CaptureError::peer(format!("Failed to create data channel: {}", e)))?;

    channel.on_open(Box::new(|| {
        Box::pin(async {
            log::debug!("Data channel '{}' opened", TRIGGER_CHANNEL_LABEL);
        })
    }));
    channel.on_close(Box::new(|| {
        Box::pin(async {
            log::debug!("Data channel '{}' closed", TRIGGER_CHANNEL_LABEL);
        })
    }));
    channel.on_error(Box::new(|e| {
        Box::pin(async move {
            log::warn!("Data channel '{}' error: {}", TRIGGER_CHANNEL_LABEL, e);
        })
    }));

    Ok(channel)
}

fn map_state(state: RTCPeerConnectionState) -> PeerState {
    match state {
        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => PeerState::New,
        RTCPeerConnectionState::Connecting => PeerState::Connecting,
        RTCPeerConnectionState::Connected => PeerState::Connected,
        RTCPeerConnectionState::Disconnected => PeerState::Disconnected,
        RTCPeerConnectionState::Failed => PeerState::Failed,
        RTCPeerConnectionState::Closed => PeerState::Closed,
    }
}

#[async_trait]
impl PeerSession for WebRtcPeerSession {
    async fn create_local_offer(&self) -> CaptureResult<GatherSignal> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(|e| CaptureError::peer(format!("Failed to create offer: {}", e)))?;

        // Must be taken before the local description starts gathering
        let gathered = self.peer_connection.gathering_complete_promise().await;

        self.peer_connection
            .set_local_description(offer)
            .await
            .map_err(|e| CaptureError::peer(format!("Failed to set local description: {}", e)))?;

        Ok(gathered)
    }

    async fn local_description(&self) -> CaptureResult<String> {
        self.peer_connection
            .local_description()
            .await
            .map(|desc| desc.sdp)
            .ok_or_else(|| CaptureError::peer("No local description after gathering"))
    }

    async fn apply_remote_answer(&self, sdp: String) -> CaptureResult<()> {
        let answer = RTCSessionDescription::answer(sdp)
            .map_err(|e| CaptureError::rejected(format!("Invalid answer: {}", e)))?;
        self.peer_connection
            .set_remote_description(answer)
            .await
            .map_err(|e| CaptureError::rejected(format!("Failed to set remote description: {}", e)))
    }

    fn connection_state(&self) -> PeerState {
        map_state(self.peer_connection.connection_state())
    }

    async fn close(&self) -> CaptureResult<()> {
        // Dropping the handler releases the track sender so the consumer sees
        // the channel close
        self.peer_connection
            .on_track(Box::new(|_, _, _| Box::pin(async {})));
        self.peer_connection
            .close()
            .await
            .map_err(|e| CaptureError::peer(format!("Failed to close peer connection: {}", e)))
    }
}

/// Incoming remote track
struct WebRtcTrack(Arc<TrackRemote>);

#[async_trait]
impl MediaTrack for WebRtcTrack {
    fn id(&self) -> String {
        self.0.id()
    }

    fn kind(&self) -> MediaKind {
        match self.0.kind() {
            RTPCodecType::Audio => MediaKind::Audio,
            RTPCodecType::Video => MediaKind::Video,
            _ => MediaKind::Unknown,
        }
    }

    fn mime_type(&self) -> String {
        self.0.codec().capability.mime_type
    }

    async fn read_packet(&self) -> Option<Packet> {
        match self.0.read_rtp().await {
            Ok((packet, _)) => Some(packet),
            Err(e) => {
                log::debug!("Track {} stopped: {}", self.0.id(), e);
                None
            }
        }
    }
}
