// Background media consumer
//
// Owns the raw media buffer for the lifetime of a session. It waits for the
// first H.264 video track, depacketises its RTP stream into an Annex-B byte
// stream until end of stream, and publishes the buffer exactly once.

use bytes::{Bytes, BytesMut};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use webrtc::rtp::codecs::h264::H264Packet;
use webrtc::rtp::packetizer::Depacketizer;

use super::types::MediaKind;
use super::{MediaTrack, TrackReceiver};

pub use webrtc::api::media_engine::MIME_TYPE_H264 as H264_MIME_TYPE;

/// Whether a track carries video the encoder can take
pub fn is_recordable(track: &dyn MediaTrack) -> bool {
    track.kind() == MediaKind::Video && track.mime_type().eq_ignore_ascii_case(H264_MIME_TYPE)
}

/// Start the consumer task for one session.
///
/// The returned receiver yields the buffer once the recorded track ends. It
/// errors if the track source closes before any recordable track arrived.
pub fn spawn_consumer(tracks: TrackReceiver) -> (oneshot::Receiver<Bytes>, JoinHandle<()>) {
    let (done_tx, done_rx) = oneshot::channel();
    let handle = tokio::spawn(consume(tracks, done_tx));
    (done_rx, handle)
}

async fn consume(mut tracks: TrackReceiver, done: oneshot::Sender<Bytes>) {
    while let Some(track) = tracks.recv().await {
        log::info!(
            "Received track: {}, codec: {}, id: {}",
            track.kind(),
            track.mime_type(),
            track.id()
        );

        if !is_recordable(track.as_ref()) {
            log::debug!("Ignoring {} track {} ({})", track.kind(), track.id(), track.mime_type());
            continue;
        }

        log::info!("Buffering video data from track {}", track.id());
        let buffer = drain_h264(track.as_ref()).await;
        if done.send(buffer).is_err() {
            log::debug!("Media buffer receiver dropped before delivery");
        }
        return;
    }

    log::debug!("Track source closed before a recordable video track arrived");
}

async fn drain_h264(track: &dyn MediaTrack) -> Bytes {
    let mut depacketizer = H264Packet::default();
    let mut buffer = BytesMut::new();
    let mut packets = 0u64;

    while let Some(packet) = track.read_packet().await {
        if packet.payload.is_empty() {
            continue;
        }
        match depacketizer.depacketize(&packet.payload) {
            Ok(nal) => {
                buffer.extend_from_slice(&nal);
                packets += 1;
            }
            Err(e) => log::debug!(
                "Dropping undecodable packet {}: {}",
                packet.header.sequence_number,
                e
            ),
        }
    }

    log::info!(
        "Track {} ended after {} packets ({} bytes buffered)",
        track.id(),
        packets,
        buffer.len()
    );
    buffer.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use webrtc::rtp::packet::Packet;

    struct ScriptedTrack {
        kind: MediaKind,
        mime: &'static str,
        packets: Mutex<VecDeque<Packet>>,
    }

    impl ScriptedTrack {
        fn boxed(kind: MediaKind, mime: &'static str, payloads: &[&'static [u8]]) -> Box<dyn MediaTrack> {
            let packets = payloads
                .iter()
                .map(|payload| Packet {
                    payload: Bytes::from_static(payload),
                    ..Default::default()
                })
                .collect();
            Box::new(Self {
                kind,
                mime,
                packets: Mutex::new(packets),
            })
        }
    }

    #[async_trait]
    impl MediaTrack for ScriptedTrack {
        fn id(&self) -> String {
            format!("{}-{}", self.kind, self.mime)
        }

        fn kind(&self) -> MediaKind {
            self.kind
        }

        fn mime_type(&self) -> String {
            self.mime.to_string()
        }

        async fn read_packet(&self) -> Option<Packet> {
            self.packets.lock().unwrap().pop_front()
        }
    }

    #[tokio::test]
    async fn test_records_first_h264_track_only() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (done, handle) = spawn_consumer(rx);

        tx.send(ScriptedTrack::boxed(MediaKind::Audio, "audio/opus", &[&[0x01, 0x02]]))
            .unwrap();
        tx.send(ScriptedTrack::boxed(MediaKind::Video, "video/VP8", &[&[0x10, 0x20]]))
            .unwrap();
        tx.send(ScriptedTrack::boxed(
            MediaKind::Video,
            "video/H264",
            &[&[0x65, 0x88], &[], &[0x41, 0x9a]],
        ))
        .unwrap();
        tx.send(ScriptedTrack::boxed(MediaKind::Video, "video/H264", &[&[0x65, 0xff]]))
            .unwrap();

        let buffer = done.await.unwrap();
        assert_eq!(
            buffer.as_ref(),
            &[0, 0, 0, 1, 0x65, 0x88, 0, 0, 0, 1, 0x41, 0x9a]
        );
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_source_closed_without_video() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (done, handle) = spawn_consumer(rx);

        tx.send(ScriptedTrack::boxed(MediaKind::Audio, "audio/opus", &[])).unwrap();
        drop(tx);

        assert!(done.await.is_err());
        handle.await.unwrap();
    }

    #[test]
    fn test_mime_match_is_case_insensitive() {
        let track = ScriptedTrack::boxed(MediaKind::Video, "video/h264", &[]);
        assert!(is_recordable(track.as_ref()));
        let audio = ScriptedTrack::boxed(MediaKind::Audio, "video/H264", &[]);
        assert!(!is_recordable(audio.as_ref()));
    }
}
