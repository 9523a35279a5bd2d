// Time expression parsing
//
// Turns user supplied text into absolute timestamps, compound durations,
// speedup ratios and closed time intervals used to select artifacts.

pub mod duration;
pub mod error;
pub mod interval;
pub mod speedup;
pub mod timestamp;

pub use duration::parse_duration;
pub use error::{TimeExprError, TimeExprResult};
pub use interval::{make_interval, make_interval_at, TimeInterval};
pub use speedup::{parse_speedup, SpeedupRatio};
pub use timestamp::{parse_timestamp, parse_timestamp_at};

/// Parse the three optional interval flags and combine them.
///
/// Empty strings mean "not given".
pub fn parse_interval(start: &str, end: &str, duration: &str) -> TimeExprResult<TimeInterval> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;
    let duration = parse_duration(duration)?;
    make_interval(start, end, duration)
}
