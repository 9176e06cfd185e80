//! Core data structures shared by every timeline component.
//!
//! Everything the front-end reads or writes derives `TS` so the generated
//! TypeScript stays in lockstep with the engine.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Chapters
// ============================================================================

/// A labeled sub-range of the media timeline, as supplied by the caller.
///
/// `end` is optional; the normalizer fills it from the next chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub struct Chapter {
    /// Start in seconds.
    pub start: f64,
    /// End in seconds (optional).
    #[serde(default)]
    pub end: Option<f64>,
    /// Display title.
    pub title: String,
}

impl Chapter {
    pub fn new(start: f64, title: impl Into<String>) -> Self {
        Self {
            start,
            end: None,
            title: title.into(),
        }
    }

    pub fn with_end(mut self, end: f64) -> Self {
        self.end = Some(end);
        self
    }
}

/// A normalized chapter: sorted, non-overlapping, `end > start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub struct ChapterSpan {
    pub start: f64,
    pub end: f64,
    pub title: String,
}

impl ChapterSpan {
    /// Length in seconds.
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open containment, `[start, end)`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }
}

impl From<&ChapterSpan> for Chapter {
    fn from(span: &ChapterSpan) -> Self {
        Chapter {
            start: span.start,
            end: Some(span.end),
            title: span.title.clone(),
        }
    }
}

// ============================================================================
// Segment
// ============================================================================

/// The active trim window. Derived from props and the resolved duration,
/// never stored across derivations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub struct PlaybackSegment {
    /// Segment start in seconds.
    pub start: f64,
    /// Segment end in seconds; `None` runs to `duration`.
    pub end: Option<f64>,
    /// Resolved media duration in seconds (always > 0).
    pub duration: f64,
}

impl PlaybackSegment {
    /// Derive the trim window from optional start/end props.
    ///
    /// Returns `None` when playback is not trimmed: no start offset and no
    /// end, or the duration is still unknown. An end that does not land
    /// strictly after the start (after clamping to the duration) is dropped.
    pub fn from_bounds(start_time: Option<f64>, end_time: Option<f64>, duration: f64) -> Option<Self> {
        if !(duration.is_finite() && duration > 0.0) {
            return None;
        }

        let start = start_time
            .filter(|s| s.is_finite())
            .unwrap_or(0.0)
            .max(0.0)
            .min(duration);
        let end = end_time.filter(|e| e.is_finite()).map(|e| e.min(duration));

        if start <= 0.0 && end.is_none() {
            return None;
        }

        let end = match end {
            Some(e) if e > start => Some(e),
            Some(e) => {
                log::debug!(
                    "[TIMELINE] Ignoring segment end {} (not after start {})",
                    e,
                    start
                );
                None
            },
            None => None,
        };

        // A start pinned to the very end with no usable end leaves nothing to play.
        if end.is_none() && start >= duration {
            return None;
        }

        Some(Self {
            start,
            end,
            duration,
        })
    }

    /// End boundary, falling back to the full duration.
    pub fn effective_end(&self) -> f64 {
        self.end.unwrap_or(self.duration)
    }

    /// Segment length in seconds.
    pub fn length(&self) -> f64 {
        self.effective_end() - self.start
    }

    /// Whether `[start, end]` of a chapter touches the segment at all.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        end > self.start && start < self.effective_end()
    }
}

// ============================================================================
// Time samples and backends
// ============================================================================

/// The two playback-driving mechanisms kept in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub enum BackendKind {
    /// The native `<video>` element.
    Native,
    /// The third-party player widget wrapping it.
    Widget,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Native => write!(f, "native"),
            BackendKind::Widget => write!(f, "widget"),
        }
    }
}

/// Where a time observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub enum SampleSource {
    /// Native media `timeupdate`.
    Native,
    /// Widget `timeupdate`.
    Widget,
    /// Fixed-interval poll fallback.
    Poll,
}

/// An instantaneous time observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub struct TimeSample {
    pub source: SampleSource,
    pub time: f64,
}

impl TimeSample {
    pub fn new(source: SampleSource, time: f64) -> Self {
        Self { source, time }
    }
}

/// Backend lifecycle as seen by the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub enum PlaybackPhase {
    /// No media attached.
    #[default]
    Uninitialized,
    /// Source attached, metadata pending.
    Loading,
    /// Seekable, not started.
    Ready,
    /// Currently playing.
    Playing,
    /// Paused mid-playback.
    Paused,
}

impl PlaybackPhase {
    /// Whether backends accept seeks in this phase.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused)
    }
}

// ============================================================================
// Engine state
// ============================================================================

/// How the resolved duration was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub enum DurationSource {
    /// Supplied by the caller.
    External,
    /// Reported by the media element.
    Media,
    /// Neither source is usable yet.
    #[default]
    Unknown,
}

/// Read-only snapshot of the engine for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub struct EngineState {
    /// Resolved duration in seconds (0 = unknown).
    pub duration: f64,
    /// Reconciled playback position in seconds.
    pub current_time: f64,
    /// Whether any backend accepts seeks.
    pub backend_ready: bool,
    /// Backend lifecycle phase.
    pub phase: PlaybackPhase,
    /// Seek waiting for the first ready backend.
    pub pending_seek: Option<f64>,
    /// Where `duration` came from.
    pub duration_source: DurationSource,
}

fn default_open() -> bool {
    true
}

/// Everything the surrounding UI hands to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub struct PlayerProps {
    /// Opaque media URL.
    #[serde(default)]
    pub video_src: String,
    /// Authoritative duration in seconds, if the server knows it.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Chapter markers.
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    /// Segment start in seconds.
    #[serde(default)]
    pub start_time: Option<f64>,
    /// Segment end in seconds.
    #[serde(default)]
    pub end_time: Option<f64>,
    /// Modal visibility; the inline player is always open.
    #[serde(default = "default_open")]
    pub open: bool,
}

impl Default for PlayerProps {
    fn default() -> Self {
        Self {
            video_src: String::new(),
            duration: None,
            chapters: Vec::new(),
            start_time: None,
            end_time: None,
            open: true,
        }
    }
}

impl PlayerProps {
    /// Segment start, `0` when absent or invalid.
    pub fn start_or_zero(&self) -> f64 {
        self.start_time
            .filter(|s| s.is_finite())
            .unwrap_or(0.0)
            .max(0.0)
    }
}
