// Speedup ratio ("1h/1s", "1d/30s" or a bare number)

use std::fmt;
use std::str::FromStr;

use chrono::Duration;

use super::duration::{parse_terms, SPEEDUP_UNITS};
use super::error::{TimeExprError, TimeExprResult};

/// Real seconds per output second. Always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SpeedupRatio(f64);

impl SpeedupRatio {
    pub fn new(ratio: f64) -> TimeExprResult<Self> {
        if ratio.is_finite() && ratio > 0.0 {
            Ok(Self(ratio))
        } else {
            Err(TimeExprError::InvalidSpeedup(ratio))
        }
    }

    /// Ratio of a real-time span to the output span it should play back in
    pub fn from_spans(real: Duration, output: Duration) -> TimeExprResult<Self> {
        let output_secs = seconds(output);
        if output_secs <= 0.0 {
            return Err(TimeExprError::InvalidSpeedup(f64::INFINITY));
        }
        Self::new(seconds(real) / output_secs)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Output playback time for a span of real time
    pub fn compress(&self, real: Duration) -> f64 {
        seconds(real) / self.0
    }
}

impl Default for SpeedupRatio {
    fn default() -> Self {
        Self(3600.0)
    }
}

impl fmt::Display for SpeedupRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

impl FromStr for SpeedupRatio {
    type Err = TimeExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_speedup(s)
    }
}

/// Parse `"<real>/<output>"` where both sides are compound durations that
/// also accept seconds, or a bare positive number.
pub fn parse_speedup(value: &str) -> TimeExprResult<SpeedupRatio> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TimeExprError::speedup(value, "empty speedup"));
    }

    let Some((real, output)) = trimmed.split_once('/') else {
        let ratio: f64 = trimmed.parse().map_err(|_| {
            TimeExprError::speedup(value, "expected '<real>/<output>' such as '1h/1s', or a number")
        })?;
        return SpeedupRatio::new(ratio);
    };

    let real = parse_side(value, real)?;
    let output = parse_side(value, output)?;
    if output.is_zero() {
        return Err(TimeExprError::speedup(value, "output span must not be zero"));
    }
    SpeedupRatio::from_spans(real, output)
}

fn parse_side(input: &str, side: &str) -> TimeExprResult<Duration> {
    if side.is_empty() {
        return Err(TimeExprError::speedup(input, "both sides of '/' are required"));
    }
    parse_terms(side, SPEEDUP_UNITS).map_err(|reason| TimeExprError::speedup(input, reason))
}

pub(crate) fn seconds(span: Duration) -> f64 {
    match span.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 1e9,
        None => span.num_milliseconds() as f64 / 1e3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_forms() {
        assert_eq!(parse_speedup("1h/1s").unwrap().value(), 3600.0);
        assert_eq!(parse_speedup("1d/30s").unwrap().value(), 2880.0);
        assert_eq!(parse_speedup("1h/1m").unwrap().value(), 60.0);
        assert_eq!(parse_speedup("30").unwrap().value(), 30.0);
    }

    #[test]
    fn test_rejections() {
        assert!(parse_speedup("").is_err());
        assert!(parse_speedup("1h/0s").is_err());
        assert!(parse_speedup("1h/").is_err());
        assert!(parse_speedup("0").is_err());
        assert!(parse_speedup("-5").is_err());
        assert!(parse_speedup("1x/1s").is_err());
    }

    #[test]
    fn test_compress() {
        let ratio = SpeedupRatio::new(30.0).unwrap();
        assert_eq!(ratio.compress(Duration::seconds(60)), 2.0);
    }

    #[test]
    fn test_zero_real_span_is_invalid() {
        assert!(matches!(
            parse_speedup("0h/1s"),
            Err(TimeExprError::InvalidSpeedup(_))
        ));
    }
}
