//! Time → percentage mapping for the timeline strip.
//!
//! Two coordinate spaces exist:
//!
//! ```text
//! whole timeline:   0 ──────────────────────────── duration
//! segment-relative:       start ──────── end
//!                         0%             100%
//! ```
//!
//! Every mapping is total: unknown durations and zero-length windows map to
//! `0` instead of producing `NaN` or infinities.

use super::types::PlaybackSegment;

/// A `[start, end]` window of media time that maps onto `[0, 100]` percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineWindow {
    pub start: f64,
    pub end: f64,
}

impl TimelineWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Whole-timeline window `[0, duration]`.
    pub fn whole(duration: f64) -> Self {
        Self::new(0.0, duration)
    }

    /// Window for the active segment, or the whole timeline when untrimmed.
    pub fn for_segment(duration: f64, segment: Option<&PlaybackSegment>) -> Self {
        match segment {
            Some(seg) => Self::new(seg.start, seg.effective_end()),
            None => Self::whole(duration),
        }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Non-degenerate windows only; everything else maps to zero.
    pub fn is_usable(&self) -> bool {
        let len = self.length();
        len.is_finite() && len > 0.0
    }

    /// Unclamped fraction of the window covered at `time`.
    fn raw_fraction(&self, time: f64) -> f64 {
        if !self.is_usable() || time.is_nan() {
            return 0.0;
        }
        (time - self.start) / self.length()
    }

    /// Position of `time` in percent, clamped to `[0, 100]`.
    pub fn percentage(&self, time: f64) -> f64 {
        clamp_percent(self.raw_fraction(time) * 100.0)
    }

    /// Width of `[from, to]` in percent of this window, clamped to `[0, 100]`.
    pub fn span_percentage(&self, from: f64, to: f64) -> f64 {
        if !self.is_usable() || from.is_nan() || to.is_nan() {
            return 0.0;
        }
        clamp_percent((to - from) / self.length() * 100.0)
    }

    /// Clamp a media time into the window.
    pub fn clamp_time(&self, time: f64) -> f64 {
        if time.is_nan() {
            return self.start;
        }
        time.max(self.start).min(self.end.max(self.start))
    }
}

/// Clamp to `[0, 100]`, mapping `NaN` to `0`.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Map an absolute time to a percentage of the timeline or active segment.
///
/// Returns `0` for any non-positive or non-finite `duration`, regardless of
/// the segment.
pub fn percentage(time: f64, duration: f64, segment: Option<&PlaybackSegment>) -> f64 {
    if !(duration.is_finite() && duration > 0.0) {
        return 0.0;
    }
    TimelineWindow::for_segment(duration, segment).percentage(time)
}
