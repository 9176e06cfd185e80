//! Trimmed-timeline playback engine for the Ballskicker match viewer.
//!
//! The engine reconciles an externally supplied duration with the media
//! element's own, keeps playback inside a start/end segment, merges time
//! reports from the native element, the player widget and a poll fallback,
//! and projects the chapter timeline strip as a pure function of time.
//!
//! Hosts (the `timeline-wasm` browser binding, the `timeline-replay` tool)
//! drive a [`TimelineEngine`] and render its [`timeline::TimelineLayout`].

pub mod config;
pub mod error;
pub mod timeline;
pub mod trace;

pub use config::EngineConfig;
pub use error::{TimelineError, TimelineResult};
pub use timeline::TimelineEngine;
