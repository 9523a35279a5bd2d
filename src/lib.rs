pub mod capture;
pub mod config;
pub mod encoder;
pub mod pipeline;
pub mod sdm;
pub mod timeexpr;
pub mod timelapse;

pub use capture::{CaptureError, CaptureOutcome, CaptureSession};
pub use config::AppConfig;
pub use timeexpr::{SpeedupRatio, TimeInterval};
pub use timelapse::{ScheduledFrame, TimestampedArtifact};

/// Common result type for nest-timelapse collaborators
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
