// Capture session controller
//
// Idle -> Negotiating -> Connected -> Recording -> Closing -> Closed, with
// any stage able to fall into Failed. Every wait is bounded. Once a peer
// session exists it is closed exactly once, whatever happened before.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

use super::consumer::spawn_consumer;
use super::error::{CaptureError, CaptureResult};
use super::types::{CaptureConfig, CaptureOutcome, CaptureState, PeerState};
use super::{AnswerExchanger, PeerSession, TrackReceiver};

/// One capture run against one peer session.
///
/// Created, driven once, and dropped. The media consumer is started on
/// construction and owns the buffer until it hands it over.
pub struct CaptureSession {
    state: CaptureState,
    peer: Arc<dyn PeerSession>,
    config: CaptureConfig,
    media: Option<oneshot::Receiver<Bytes>>,
    consumer: Option<JoinHandle<()>>,
    close_attempted: bool,
}

impl CaptureSession {
    /// Create a session and start its media consumer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(peer: Arc<dyn PeerSession>, tracks: TrackReceiver, config: CaptureConfig) -> Self {
        let (media, consumer) = spawn_consumer(tracks);
        Self {
            state: CaptureState::Idle,
            peer,
            config,
            media: Some(media),
            consumer: Some(consumer),
            close_attempted: false,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Exchange session descriptions with the remote device
    pub async fn negotiate(&mut self, exchanger: &dyn AnswerExchanger) -> CaptureResult<()> {
        self.expect_state("negotiate", CaptureState::Idle)?;
        self.transition(CaptureState::Negotiating);

        let mut gathered = self.peer.create_local_offer().await?;
        match timeout(self.config.gather_timeout, gathered.recv()).await {
            Ok(Some(())) => log::info!("ICE candidate gathering complete"),
            Ok(None) => return Err(CaptureError::peer("gathering signal dropped")),
            Err(_) => {
                return Err(CaptureError::NegotiationTimeout {
                    timeout: self.config.gather_timeout,
                })
            }
        }

        let offer = self.peer.local_description().await?;
        let answer = exchanger
            .exchange(&offer)
            .await
            .map_err(|e| CaptureError::rejected(format!("answer exchange failed: {}", e)))?;
        if answer.trim().is_empty() {
            return Err(CaptureError::rejected("remote answer is empty"));
        }

        self.peer
            .apply_remote_answer(answer)
            .await
            .map_err(|e| CaptureError::rejected(format!("remote answer not applied: {}", e)))?;
        log::debug!("Remote answer applied");
        Ok(())
    }

    /// Wait until the connection is established
    pub async fn await_connected(&mut self) -> CaptureResult<()> {
        self.expect_state("await connection", CaptureState::Negotiating)?;

        let deadline = Instant::now() + self.config.connect_timeout;
        loop {
            match self.peer.connection_state() {
                PeerState::Connected => break,
                state if state.is_terminal() => {
                    return Err(CaptureError::ConnectionFailed { state });
                }
                _ => {}
            }
            if Instant::now() >= deadline {
                return Err(CaptureError::ConnectionTimeout {
                    timeout: self.config.connect_timeout,
                });
            }
            sleep(self.config.poll_interval.min(deadline - Instant::now())).await;
        }

        log::info!("WebRTC connection established");
        self.transition(CaptureState::Connected);
        Ok(())
    }

    /// Hold the session open for the recording window
    pub async fn record(&mut self) -> CaptureResult<()> {
        self.expect_state("record", CaptureState::Connected)?;
        self.transition(CaptureState::Recording);
        log::info!("Recording for {:?}...", self.config.record_duration);

        let started = Instant::now();
        let deadline = started + self.config.record_duration;
        while Instant::now() < deadline {
            if self.peer.connection_state().is_terminal() {
                return Err(CaptureError::SessionDropped {
                    elapsed: started.elapsed(),
                });
            }
            sleep(self.config.poll_interval.min(deadline - Instant::now())).await;
        }
        Ok(())
    }

    /// Close the peer session and wait for it to report closed.
    ///
    /// Only the first call reaches the peer; later calls return `Ok(())`.
    pub async fn close(&mut self) -> CaptureResult<()> {
        if self.close_attempted {
            return Ok(());
        }
        self.close_attempted = true;

        let failed = self.state == CaptureState::Failed;
        if !failed {
            self.transition(CaptureState::Closing);
        }

        let closed = match self.peer.close().await {
            Ok(()) => Ok(self
                .wait_for_peer_state(PeerState::Closed, self.config.close_timeout)
                .await),
            Err(e) => Err(e),
        };
        if !failed {
            self.transition(CaptureState::Closed);
        }

        match closed {
            Ok(true) => {
                log::info!("WebRTC connection closed");
                Ok(())
            }
            Ok(false) => Err(CaptureError::CloseTimeout {
                timeout: self.config.close_timeout,
            }),
            Err(e) => Err(e),
        }
    }

    /// Wait for the media consumer to hand over its buffer
    pub async fn collect_buffer(&mut self) -> CaptureResult<Bytes> {
        self.expect_state("collect media", CaptureState::Closed)?;
        let media = self
            .media
            .take()
            .ok_or_else(|| CaptureError::no_media("buffer was already collected"))?;

        let buffer = match timeout(self.config.collect_timeout, media).await {
            Ok(Ok(buffer)) => buffer,
            Ok(Err(_)) => {
                if let Some(consumer) = self.consumer.take() {
                    if let Err(e) = consumer.await {
                        log::warn!("Media consumer task ended abnormally: {}", e);
                        return Err(CaptureError::no_media(format!(
                            "media consumer task failed: {}",
                            e
                        )));
                    }
                }
                return Err(CaptureError::no_media(
                    "session ended before a video track was opened",
                ));
            }
            Err(_) => {
                return Err(CaptureError::no_media(format!(
                    "no buffer delivered within {:?}; the device may not have opened an H.264 video track",
                    self.config.collect_timeout
                )))
            }
        };

        if buffer.is_empty() {
            return Err(CaptureError::no_media("video track ended without any data"));
        }
        if let Some(consumer) = self.consumer.take() {
            if let Err(e) = consumer.await {
                log::warn!("Media consumer task ended abnormally: {}", e);
            }
        }
        Ok(buffer)
    }

    /// Drive the full state machine.
    ///
    /// A failing stage is followed by one best-effort close and its error is
    /// returned. A close timeout after a successful recording is reported in
    /// the outcome's warnings instead.
    pub async fn run(mut self, exchanger: &dyn AnswerExchanger) -> CaptureResult<CaptureOutcome> {
        if let Err(e) = self.drive(exchanger).await {
            log::warn!("Capture failed while {}: {}", self.state, e);
            self.transition(CaptureState::Failed);
            if let Err(close_err) = self.close().await {
                log::warn!("Teardown after failure: {}", close_err);
            }
            return Err(e);
        }

        let mut warnings = Vec::new();
        if let Err(e) = self.close().await {
            log::warn!("Failed to clean up connection: {}", e);
            warnings.push(e);
        }
        log::info!("Recording complete");

        let buffer = self.collect_buffer().await.inspect_err(|_| {
            self.state = CaptureState::Failed;
        })?;
        Ok(CaptureOutcome { buffer, warnings })
    }

    async fn drive(&mut self, exchanger: &dyn AnswerExchanger) -> CaptureResult<()> {
        self.negotiate(exchanger).await?;
        self.await_connected().await?;
        self.record().await
    }

    async fn wait_for_peer_state(&self, wanted: PeerState, bound: Duration) -> bool {
        let deadline = Instant::now() + bound;
        loop {
            if self.peer.connection_state() == wanted {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    fn expect_state(&self, operation: &'static str, expected: CaptureState) -> CaptureResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CaptureError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, next: CaptureState) {
        log::debug!("Capture session {} -> {}", self.state, next);
        self.state = next;
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            consumer.abort();
        }
    }
}
