// Frame timeline scheduler
//
// Turns a set of timestamped stills into a playback schedule in which each
// still is shown for its real-time gap to the next one divided by the
// speedup ratio. Stills that would be shown for less than one output frame
// at the maximum rate are merged into the earliest pending still instead of
// being clamped, so the ratio stays an exact compression factor.

use std::time::Duration;

use crate::timeexpr::{SpeedupRatio, TimeInterval};

use super::error::{ScheduleError, ScheduleResult};
use super::types::{ScheduledFrame, TimestampedArtifact};

/// Default playback rate ceiling in frames per second
pub const DEFAULT_MAX_OUTPUT_RATE: f64 = 60.0;

/// Compute the playback schedule for `artifacts`.
///
/// The returned frames are strictly increasing in capture time, every
/// duration except the last is at least `1 / max_output_rate` seconds, and
/// the last frame always has a zero duration.
pub fn schedule(
    artifacts: &[TimestampedArtifact],
    ratio: SpeedupRatio,
    interval: Option<&TimeInterval>,
    max_output_rate: f64,
) -> ScheduleResult<Vec<ScheduledFrame>> {
    if !max_output_rate.is_finite() || max_output_rate <= 0.0 {
        return Err(ScheduleError::InvalidOutputRate(max_output_rate));
    }
    let min_display_secs = 1.0 / max_output_rate;

    let mut selected: Vec<&TimestampedArtifact> = artifacts
        .iter()
        .filter(|artifact| interval.is_none_or(|bound| bound.contains(artifact.captured_at)))
        .collect();

    if selected.is_empty() {
        return Err(ScheduleError::no_artifacts(describe_bound(
            interval,
            artifacts.len(),
        )));
    }

    selected.sort_by_key(|artifact| (artifact.captured_at, artifact.discovery_index));

    let mut frames = Vec::new();
    let mut current = selected[0];

    for &next in &selected[1..] {
        let gap_secs = ratio.compress(next.captured_at - current.captured_at);
        if gap_secs < min_display_secs {
            // Too close to show on its own; keep the earlier still pending
            continue;
        }

        let display_duration = Duration::try_from_secs_f64(gap_secs).map_err(|_| {
            ScheduleError::DurationOverflow {
                artifact: current.path.clone(),
                gap_secs,
            }
        })?;
        frames.push(ScheduledFrame {
            artifact: current.clone(),
            display_duration,
        });
        current = next;
    }

    frames.push(ScheduledFrame {
        artifact: current.clone(),
        display_duration: Duration::ZERO,
    });

    log::debug!(
        "Scheduled {} of {} artifacts at {} (max {} fps)",
        frames.len(),
        selected.len(),
        ratio,
        max_output_rate
    );
    Ok(frames)
}

fn describe_bound(interval: Option<&TimeInterval>, scanned: usize) -> String {
    match interval {
        Some(interval) if scanned > 0 => format!(
            "none of the {} scanned artifacts fall within {}",
            scanned, interval
        ),
        Some(interval) => format!("input set is empty (interval {})", interval),
        None => "input set is empty".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn artifact(name: &str, captured_at: DateTime<Utc>, index: usize) -> TimestampedArtifact {
        TimestampedArtifact::new(name, captured_at, index)
    }

    #[test]
    fn test_single_artifact() {
        let frames = schedule(
            &[artifact("a.jpg", at(0), 0)],
            SpeedupRatio::new(1.0).unwrap(),
            None,
            DEFAULT_MAX_OUTPUT_RATE,
        )
        .unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_final());
    }

    #[test]
    fn test_equal_timestamps_collapse_to_first_discovered() {
        let artifacts = vec![
            artifact("second.jpg", at(0), 1),
            artifact("first.jpg", at(0), 0),
            artifact("later.jpg", at(10), 2),
        ];
        let frames = schedule(&artifacts, SpeedupRatio::new(1.0).unwrap(), None, 60.0).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].artifact.path.to_str(), Some("first.jpg"));
        assert_eq!(frames[0].display_duration, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_rate() {
        let artifacts = vec![artifact("a.jpg", at(0), 0)];
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                schedule(&artifacts, SpeedupRatio::default(), None, rate),
                Err(ScheduleError::InvalidOutputRate(_))
            ));
        }
    }

    #[test]
    fn test_empty_input_without_interval() {
        let err = schedule(&[], SpeedupRatio::default(), None, 60.0).unwrap_err();
        assert!(matches!(err, ScheduleError::NoArtifacts { .. }));
    }
}
