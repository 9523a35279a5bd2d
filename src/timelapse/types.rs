// Timelapse data types

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// A still image with a capture time recovered from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedArtifact {
    pub path: PathBuf,
    pub captured_at: DateTime<Utc>,
    /// Position in scan order, used to order artifacts with equal timestamps
    pub discovery_index: usize,
}

impl TimestampedArtifact {
    pub fn new(path: impl Into<PathBuf>, captured_at: DateTime<Utc>, discovery_index: usize) -> Self {
        Self {
            path: path.into(),
            captured_at,
            discovery_index,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One entry of a playback schedule.
///
/// A zero `display_duration` marks the final frame of a schedule and tells
/// the encoder no explicit duration follows.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledFrame {
    pub artifact: TimestampedArtifact,
    pub display_duration: Duration,
}

impl ScheduledFrame {
    pub fn is_final(&self) -> bool {
        self.display_duration.is_zero()
    }
}
