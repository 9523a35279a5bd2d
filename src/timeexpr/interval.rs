// Time intervals and the start/end/duration combinator

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use super::error::{TimeExprError, TimeExprResult};

/// Closed time interval `[start, end]` with `start <= end`.
///
/// Both bounds are inclusive when filtering artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    /// Create an interval, rejecting an end that precedes the start
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeExprResult<Self> {
        if end < start {
            return Err(TimeExprError::InvertedInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Interval from the beginning of representable time up to `end`
    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether the lower bound is the open "beginning of time" sentinel
    pub fn has_open_start(&self) -> bool {
        self.start == DateTime::<Utc>::MIN_UTC
    }

    /// Inclusive containment check
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_open_start() {
            write!(f, "[beginning of time, {}]", self.end)
        } else {
            write!(f, "[{}, {}]", self.start, self.end)
        }
    }
}

/// Combine optional start, end and duration into an interval, evaluating
/// "now" at call time.
pub fn make_interval(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    duration: Option<Duration>,
) -> TimeExprResult<TimeInterval> {
    make_interval_at(start, end, duration, Utc::now())
}

/// Combine optional start, end and duration into an interval.
///
/// | start | end | duration | result                      |
/// |-------|-----|----------|-----------------------------|
/// | yes   | yes | yes      | `OverdeterminedInterval`    |
/// | yes   | yes | no       | `[start, end]`              |
/// | yes   | no  | yes      | `[start, start + duration]` |
/// | no    | yes | yes      | `[end - duration, end]`     |
/// | no    | no  | yes      | `[now - duration, now]`     |
/// | yes   | no  | no       | `[start, now]`              |
/// | no    | yes | no       | `[MIN, end]`                |
/// | no    | no  | no       | `[MIN, now]`                |
pub fn make_interval_at(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    duration: Option<Duration>,
    now: DateTime<Utc>,
) -> TimeExprResult<TimeInterval> {
    match (start, end, duration) {
        (Some(_), Some(_), Some(_)) => Err(TimeExprError::OverdeterminedInterval),
        (Some(start), Some(end), None) => TimeInterval::new(start, end),
        (Some(start), None, Some(duration)) => {
            TimeInterval::new(start, shift(start, duration)?)
        }
        (None, Some(end), Some(duration)) => TimeInterval::new(shift(end, -duration)?, end),
        (None, None, Some(duration)) => TimeInterval::new(shift(now, -duration)?, now),
        (Some(start), None, None) => TimeInterval::new(start, now),
        (None, Some(end), None) => Ok(TimeInterval::until(end)),
        (None, None, None) => Ok(TimeInterval::until(now)),
    }
}

fn shift(instant: DateTime<Utc>, by: Duration) -> TimeExprResult<DateTime<Utc>> {
    instant
        .checked_add_signed(by)
        .ok_or(TimeExprError::IntervalOutOfRange { anchor: instant })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, h, m, 0).unwrap()
    }

    #[test]
    fn test_contains_is_inclusive() {
        let interval = TimeInterval::new(at(10, 0), at(11, 0)).unwrap();
        assert!(interval.contains(at(10, 0)));
        assert!(interval.contains(at(11, 0)));
        assert!(!interval.contains(at(11, 1)));
        assert!(!interval.contains(at(9, 59)));
    }

    #[test]
    fn test_empty_interval_is_valid() {
        let interval = TimeInterval::new(at(10, 0), at(10, 0)).unwrap();
        assert_eq!(interval.duration(), Duration::zero());
    }

    #[test]
    fn test_open_start_display() {
        let interval = TimeInterval::until(at(11, 0));
        assert!(interval.has_open_start());
        assert!(interval.to_string().starts_with("[beginning of time"));
    }

    #[test]
    fn test_start_only_ends_now() {
        let now = at(12, 0);
        let interval = make_interval_at(Some(at(10, 0)), None, None, now).unwrap();
        assert_eq!(interval.start(), at(10, 0));
        assert_eq!(interval.end(), now);
    }

    #[test]
    fn test_start_after_now_is_inverted() {
        let now = at(9, 0);
        let err = make_interval_at(Some(at(10, 0)), None, None, now).unwrap_err();
        assert!(matches!(err, TimeExprError::InvertedInterval { .. }));
    }
}
