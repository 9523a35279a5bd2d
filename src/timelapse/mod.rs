// Timelapse assembly
//
// Discovers timestamped stills, filters them by a time interval, and turns
// them into a variable-duration playback schedule for the encoder.

pub mod error;
pub mod naming;
pub mod scan;
pub mod scheduler;
pub mod script;
pub mod types;

pub use error::{ScheduleError, ScheduleResult};
pub use naming::ArtifactName;
pub use scan::scan_artifacts;
pub use scheduler::{schedule, DEFAULT_MAX_OUTPUT_RATE};
pub use script::{render_frame, render_script};
pub use types::{ScheduledFrame, TimestampedArtifact};
