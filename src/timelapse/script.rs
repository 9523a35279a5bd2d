// ffmpeg concat demuxer script rendering

use std::fmt::Write as _;
use std::path::Path;

use super::types::ScheduledFrame;

/// Render one schedule entry as concat demuxer lines.
///
/// The final frame, whose duration is zero, gets no `duration` line.
pub fn render_frame(frame: &ScheduledFrame) -> String {
    let mut entry = format!("file 'file://{}'", escape_path(&frame.artifact.path));
    if !frame.display_duration.is_zero() {
        let _ = write!(entry, "\nduration {:.6}", frame.display_duration.as_secs_f64());
    }
    entry
}

/// Render a whole schedule, one entry per frame, newline terminated
pub fn render_script(frames: &[ScheduledFrame]) -> String {
    let mut script = String::new();
    for frame in frames {
        script.push_str(&render_frame(frame));
        script.push('\n');
    }
    script
}

fn escape_path(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute.to_string_lossy().replace('\'', "'\\''")
}
