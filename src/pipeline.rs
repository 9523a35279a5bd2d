// Pipeline orchestration
//
// Straight-line glue for the two stages: snapshot capture and timelapse
// assembly. Everything external is reached through trait objects so both
// stages run against fakes in tests.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::capture::{CaptureConfig, CaptureError, CaptureResult, CaptureSession, PeerSession, TrackReceiver};
use crate::encoder::{AssembleRequest, Encoder};
use crate::sdm::{DeviceDirectory, DeviceOfferExchanger};
use crate::timeexpr::{SpeedupRatio, TimeInterval};
use crate::timelapse::{render_script, scan_artifacts, schedule, ArtifactName};

/// Inputs for one snapshot
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub enterprise_id: String,
    pub output_dir: PathBuf,
    pub naming: ArtifactName,
    pub capture: CaptureConfig,
}

/// Result of a snapshot
#[derive(Debug)]
pub struct CaptureReport {
    /// Written still image
    pub image: PathBuf,
    /// Advisory failures from the capture session
    pub warnings: Vec<CaptureError>,
}

/// Find the camera, record a short clip, and write its first frame under
/// the dated output tree.
///
/// `open_peer` is only called once a camera was found.
pub async fn capture_snapshot<F, Fut>(
    directory: Arc<dyn DeviceDirectory>,
    open_peer: F,
    encoder: &dyn Encoder,
    request: &CaptureRequest,
) -> Result<CaptureReport>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = CaptureResult<(Arc<dyn PeerSession>, TrackReceiver)>>,
{
    let camera = directory
        .find_capture_device(&request.enterprise_id)
        .await
        .context("Failed to find camera")?;

    let (peer, tracks) = open_peer().await.context("Failed to create peer connection")?;
    let session = CaptureSession::new(peer, tracks, request.capture.clone());
    let exchanger = DeviceOfferExchanger::new(directory, camera);

    let outcome = session.run(&exchanger).await.context("Capture failed")?;
    for warning in &outcome.warnings {
        log::warn!("{}", warning);
    }

    let image = request.naming.path_for(&request.output_dir, Utc::now());
    encoder
        .extract_still(outcome.buffer, &image)
        .await
        .context("Failed to extract frame")?;

    Ok(CaptureReport {
        image,
        warnings: outcome.warnings,
    })
}

/// Inputs for one timelapse
#[derive(Debug, Clone)]
pub struct TimelapseRequest {
    pub input_dir: PathBuf,
    pub naming: ArtifactName,
    pub speedup: SpeedupRatio,
    pub interval: Option<TimeInterval>,
    pub max_output_rate: f64,
    pub output: AssembleRequest,
}

/// Scan, schedule and encode. Returns the number of frames in the video.
pub async fn build_timelapse(encoder: &dyn Encoder, request: &TimelapseRequest) -> Result<usize> {
    if !request.output.overwrite && request.output.output.exists() {
        anyhow::bail!(crate::encoder::EncoderError::OutputExists(
            request.output.output.clone()
        ));
    }

    let artifacts = {
        let root = request.input_dir.clone();
        let naming = request.naming.clone();
        tokio::task::spawn_blocking(move || scan_artifacts(&root, &naming))
            .await
            .context("Artifact scan task failed")?
            .with_context(|| format!("Failed to scan {}", request.input_dir.display()))?
    };

    let frames = schedule(
        &artifacts,
        request.speedup,
        request.interval.as_ref(),
        request.max_output_rate,
    )?;
    log::info!(
        "Encoding {} frames from {} artifacts at {}",
        frames.len(),
        artifacts.len(),
        request.speedup
    );

    encoder
        .assemble(render_script(&frames), &request.output)
        .await
        .context("Failed to generate timelapse")?;
    Ok(frames.len())
}

/// Verify the input root is an existing directory
pub fn check_input_dir(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to access input directory {}", path.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("Input path is not a directory: {}", path.display());
    }
    Ok(())
}
