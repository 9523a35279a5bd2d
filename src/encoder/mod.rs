// External video encoder
//
// Turns a raw H.264 buffer into a still image and a concat script into a
// timelapse video.

pub mod crop;
pub mod error;
pub mod ffmpeg;

pub use crop::{Crop, CropRange};
pub use error::{EncoderError, EncoderResult};
pub use ffmpeg::FfmpegEncoder;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

/// Output settings for a timelapse encode
#[derive(Debug, Clone, PartialEq)]
pub struct AssembleRequest {
    pub output: PathBuf,
    pub overwrite: bool,
    pub crop: Crop,
}

impl AssembleRequest {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            overwrite: false,
            crop: Crop::default(),
        }
    }
}

/// Encoder collaborator
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Decode the first frame of an Annex-B H.264 buffer into an image
    async fn extract_still(&self, buffer: Bytes, output: &Path) -> EncoderResult<()>;

    /// Encode the frames listed in a concat script into a video
    async fn assemble(&self, script: String, request: &AssembleRequest) -> EncoderResult<()>;
}
