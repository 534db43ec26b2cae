use serde::Serialize;
use thiserror::Error;

use crate::formats::time::format_timestamp;

/// One bounded, possibly overlapping time range of the source media.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub index: usize,
    pub start_time: f64,
    pub duration: f64,
    pub offset_seconds: f64,
}

impl Window {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn label(&self) -> String {
        format!(
            "{} --> {}",
            format_timestamp(self.start_time),
            format_timestamp(self.end_time())
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    #[error("media duration must be a positive number of seconds (got {0})")]
    InvalidDuration(f64),
    #[error("window of {window}s cannot advance with {overlap}s of overlap")]
    Geometry { window: f64, overlap: f64 },
    #[error("media of {duration}s needs more than {max} windows")]
    TooManyWindows { duration: f64, max: usize },
}

/// Upper bound on windows per run; about 78 hours at the default geometry.
pub const MAX_WINDOWS: usize = 10_000;

pub trait Segmenter {
    /// Ordered windows fully covering `[0, duration]`.
    fn windows(&self, duration: f64) -> Result<Vec<Window>, SegmentError>;
}

/// Fixed-length windows where each one reaches `overlap` seconds into the next.
#[derive(Debug, Clone)]
pub struct FixedWindowSegmenter {
    window: f64,
    overlap: f64,
}

impl FixedWindowSegmenter {
    pub fn new(window: f64, overlap: f64) -> Result<Self, SegmentError> {
        if !(window.is_finite() && overlap.is_finite() && overlap >= 0.0 && window > overlap) {
            return Err(SegmentError::Geometry { window, overlap });
        }
        Ok(Self { window, overlap })
    }
}

impl Segmenter for FixedWindowSegmenter {
    fn windows(&self, duration: f64) -> Result<Vec<Window>, SegmentError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(SegmentError::InvalidDuration(duration));
        }

        if duration <= self.window {
            return Ok(vec![Window {
                index: 0,
                start_time: 0.0,
                duration,
                offset_seconds: 0.0,
            }]);
        }

        let step = self.window - self.overlap;
        let count = (duration / step).ceil();
        if count > MAX_WINDOWS as f64 {
            return Err(SegmentError::TooManyWindows {
                duration,
                max: MAX_WINDOWS,
            });
        }

        let mut windows = Vec::with_capacity(count as usize);
        for index in 0..count as usize {
            let start = index as f64 * step;
            if start >= duration {
                break;
            }
            let end = (start + self.window).min(duration);
            windows.push(Window {
                index,
                start_time: start,
                duration: end - start,
                offset_seconds: start,
            });
        }

        tracing::debug!(duration, windows = windows.len(), "segmented media");
        Ok(windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_media_is_one_window() {
        let seg = FixedWindowSegmenter::new(30.0, 2.0).unwrap();
        let w = seg.windows(12.5).unwrap();
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].duration, 12.5);
    }

    #[test]
    fn windows_overlap_by_two_seconds() {
        let seg = FixedWindowSegmenter::new(30.0, 2.0).unwrap();
        let w = seg.windows(58.0).unwrap();
        let starts: Vec<f64> = w.iter().map(|w| w.start_time).collect();
        assert_eq!(starts, vec![0.0, 28.0, 56.0]);
        assert_eq!(w[0].end_time(), 30.0);
        assert_eq!(w[1].end_time(), 58.0);
        assert_eq!(w[2].duration, 2.0);
        assert_eq!(w[1].label(), "00:00:28.000 --> 00:00:58.000");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(FixedWindowSegmenter::new(2.0, 2.0).is_err());
        let seg = FixedWindowSegmenter::new(30.0, 2.0).unwrap();
        assert_eq!(seg.windows(0.0), Err(SegmentError::InvalidDuration(0.0)));
        assert!(seg.windows(f64::NAN).is_err());
    }

    #[test]
    fn absurd_duration_is_rejected_up_front() {
        let seg = FixedWindowSegmenter::new(30.0, 2.0).unwrap();
        assert_eq!(
            seg.windows(1e18),
            Err(SegmentError::TooManyWindows {
                duration: 1e18,
                max: MAX_WINDOWS,
            })
        );
        let longest = MAX_WINDOWS as f64 * 28.0;
        assert_eq!(seg.windows(longest).unwrap().len(), MAX_WINDOWS);
        assert!(seg.windows(longest + 1.0).is_err());
    }

    proptest! {
        #[test]
        fn windows_cover_media(tenths in 1u32..20_000) {
            let duration = tenths as f64 / 10.0;
            let seg = FixedWindowSegmenter::new(30.0, 2.0).unwrap();
            let w = seg.windows(duration).unwrap();

            prop_assert_eq!(w[0].start_time, 0.0);
            prop_assert!((w.last().unwrap().end_time() - duration).abs() < 1e-9);
            for win in &w {
                prop_assert!(win.duration <= 30.0);
                prop_assert!(win.duration > 0.0);
            }
            for pair in w.windows(2) {
                prop_assert!(pair[1].start_time <= pair[0].end_time());
            }
        }
    }
}
