//! Trimmed-timeline playback engine.
//!
//! Components, in dependency order:
//! - `duration`: picks the authoritative duration
//! - `coord`: time to percentage mapping
//! - `chapters`: chapter normalization
//! - `clock`: last-write-wins time reconciliation and segment loop-back
//! - `seek`: seek fan-out, fallback and queueing over `backend`
//! - `layout`: render model for the timeline strip
//!
//! `engine` wires them together around a single state object.

pub mod backend;
pub mod chapters;
pub mod clock;
pub mod coord;
pub mod duration;
pub mod engine;
pub mod layout;
pub mod scripted;
pub mod seek;
pub mod types;
pub mod vtt;


pub use backend::{BackendPair, ChapterTrackSink, PlaybackBackend, WidgetFactory, WidgetSlot};
pub use chapters::{active_chapter, normalize_chapters, normalize_chapters_with};
pub use clock::{ClockCommand, ClockEvent, ClockState, PollPlan};
pub use coord::{percentage, TimelineWindow};
pub use duration::{resolve_duration, ResolvedDuration};
pub use engine::{MediaEvent, TimelineEngine, WidgetEvent};
pub use layout::{project_layout, Band, ChapterBand, LayoutInput, RenderMode, TimeLabels, TimelineLayout};
pub use seek::{clamp_seek_target, SeekController, SeekOutcome};
pub use types::*;
pub use vtt::{chapter_vtt, format_clock, format_vtt_timestamp};
