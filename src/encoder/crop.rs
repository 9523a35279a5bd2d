// Fractional crop ranges and the ffmpeg crop filter

use std::fmt;

use super::error::{EncoderError, EncoderResult};

/// A `start-end` slice of one axis, as fractions of the frame size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRange {
    start: f64,
    end: f64,
}

impl CropRange {
    pub fn new(start: f64, end: f64) -> Option<Self> {
        (start >= 0.0 && end <= 1.0 && start < end).then_some(Self { start, end })
    }

    /// Parse `0.4-0.6` style input for the named axis
    pub fn parse(axis: &'static str, value: &str) -> EncoderResult<Self> {
        let (start, end) = value
            .split_once('-')
            .filter(|(_, end)| !end.contains('-'))
            .ok_or_else(|| EncoderError::invalid_crop(axis, value, "expected 'start-end' (e.g. '0.4-0.6')"))?;

        let start: f64 = start
            .trim()
            .parse()
            .map_err(|e| EncoderError::invalid_crop(axis, value, format!("invalid start value: {}", e)))?;
        let end: f64 = end
            .trim()
            .parse()
            .map_err(|e| EncoderError::invalid_crop(axis, value, format!("invalid end value: {}", e)))?;

        Self::new(start, end).ok_or_else(|| {
            EncoderError::invalid_crop(
                axis,
                value,
                "values must be between 0 and 1, and start must be less than end",
            )
        })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for CropRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Optional crop on each axis
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Crop {
    pub x: Option<CropRange>,
    pub y: Option<CropRange>,
}

impl Crop {
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none()
    }

    /// ffmpeg `crop=` filter, or `None` when nothing is cropped
    pub fn filter(&self) -> Option<String> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(format!(
                "crop=iw*{:.6}:ih*{:.6}:iw*{:.6}:ih*{:.6}",
                x.span(),
                y.span(),
                x.start,
                y.start
            )),
            (Some(x), None) => Some(format!("crop=iw*{:.6}:ih:iw*{:.6}:0", x.span(), x.start)),
            (None, Some(y)) => Some(format!("crop=iw:ih*{:.6}:0:ih*{:.6}", y.span(), y.start)),
            (None, None) => None,
        }
    }
}
