// Time expression error types and result aliases

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for time expression parsing
pub type TimeExprResult<T> = Result<T, TimeExprError>;

/// Errors produced while parsing timestamps, durations and speedup ratios,
/// or while combining them into an interval.
///
/// Every variant keeps the offending input so the caller can report which
/// flag or setting was wrong.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TimeExprError {
    /// Timestamp text did not match any accepted shape
    #[error("Malformed timestamp '{input}': {reason} (at '{fragment}')")]
    MalformedTimestamp {
        input: String,
        fragment: String,
        reason: String,
    },

    /// Compound duration text was invalid
    #[error("Malformed duration '{input}': {reason}")]
    MalformedDuration { input: String, reason: String },

    /// Speedup ratio text was invalid
    #[error("Malformed speedup '{input}': {reason}")]
    MalformedSpeedup { input: String, reason: String },

    /// Speedup ratio value was not a positive finite number
    #[error("Invalid speedup ratio {0}: must be positive and finite")]
    InvalidSpeedup(f64),

    /// Start, end and duration were all supplied
    #[error("Overdetermined interval: duration cannot be combined with both start and end")]
    OverdeterminedInterval,

    /// Applying the duration left the representable time range
    #[error("Interval out of range: duration cannot be applied to {anchor}")]
    IntervalOutOfRange { anchor: DateTime<Utc> },

    /// End precedes start
    #[error("Inverted interval: end {end} is before start {start}")]
    InvertedInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl TimeExprError {
    /// Create a malformed timestamp error
    pub fn timestamp(
        input: impl Into<String>,
        fragment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedTimestamp {
            input: input.into(),
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed duration error
    pub fn duration(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDuration {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed speedup error
    pub fn speedup(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSpeedup {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
