//! Deterministic trace replay.
//!
//! A trace is a JSON list of engine inputs captured from a player session
//! (props, attachments, media and widget events, poll ticks, seeks). Replay
//! runs them against scripted backends and records an [`EngineState`] frame
//! per step, which makes field reports reproducible without a browser.
//!
//! ```json
//! {
//!   "props": { "videoSrc": "match.mp4", "startTime": 5, "endTime": 15 },
//!   "steps": [
//!     { "step": "attachNative" },
//!     { "step": "media", "event": { "type": "loadedMetadata", "duration": 30 } },
//!     { "step": "media", "event": { "type": "timeUpdate", "time": 15 } }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{ResultExt, TimelineError, TimelineResult};
use crate::timeline::engine::{MediaEvent, TimelineEngine, WidgetEvent};
use crate::timeline::layout::TimelineLayout;
use crate::timeline::scripted::{RecordingSink, ScriptHandle, ScriptedBackend, ScriptedWidgetFactory};
use crate::timeline::seek::SeekOutcome;
use crate::timeline::types::{BackendKind, EngineState, PlayerProps};

/// One recorded engine input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum TraceStep {
    /// Replace the player props.
    Props { props: PlayerProps },
    /// Attach the native element.
    AttachNative {
        #[serde(default)]
        ready: bool,
    },
    /// Construct the widget; `fail` simulates a construction error.
    AttachWidget {
        #[serde(default)]
        ready: bool,
        #[serde(default)]
        fail: Option<String>,
    },
    /// Attach a chapter-track sink.
    AttachChapterSink,
    Media { event: MediaEvent },
    Widget { event: WidgetEvent },
    /// Adjust a scripted backend directly (drift, stalls, failures).
    Backend {
        backend: BackendKind,
        #[serde(default)]
        ready: Option<bool>,
        #[serde(default)]
        paused: Option<bool>,
        #[serde(default)]
        time: Option<f64>,
        #[serde(default, rename = "failSeeks")]
        fail_seeks: Option<bool>,
    },
    /// Poll fallback tick.
    Poll,
    Seek { target: f64 },
    SeekChapter { index: usize },
    /// Record the layout in this step's frame.
    Layout,
    Teardown,
}

impl TraceStep {
    fn name(&self) -> &'static str {
        match self {
            TraceStep::Props { .. } => "props",
            TraceStep::AttachNative { .. } => "attachNative",
            TraceStep::AttachWidget { .. } => "attachWidget",
            TraceStep::AttachChapterSink => "attachChapterSink",
            TraceStep::Media { .. } => "media",
            TraceStep::Widget { .. } => "widget",
            TraceStep::Backend { .. } => "backend",
            TraceStep::Poll => "poll",
            TraceStep::Seek { .. } => "seek",
            TraceStep::SeekChapter { .. } => "seekChapter",
            TraceStep::Layout => "layout",
            TraceStep::Teardown => "teardown",
        }
    }
}

/// A recorded session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    /// Props the engine is created with.
    #[serde(default)]
    pub props: PlayerProps,
    pub steps: Vec<TraceStep>,
}

impl Trace {
    pub fn from_json_str(json: &str) -> TimelineResult<Self> {
        serde_json::from_str(json).map_err(|e| TimelineError::Trace(format!("invalid trace: {}", e)))
    }

    pub fn load(path: &Path) -> TimelineResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read trace {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

/// Engine state after one replayed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayFrame {
    pub step: usize,
    pub kind: String,
    pub state: EngineState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seek: Option<SeekOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polled: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_track: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<TimelineLayout>,
}

struct Replayer {
    engine: TimelineEngine,
    native: Option<ScriptHandle>,
    widget: Option<ScriptHandle>,
}

impl Replayer {
    fn handle(&self, kind: BackendKind, index: usize) -> TimelineResult<&ScriptHandle> {
        let handle = match kind {
            BackendKind::Native => self.native.as_ref(),
            BackendKind::Widget => self.widget.as_ref(),
        };
        handle.ok_or_else(|| TimelineError::Trace(format!("step {}: {} backend not attached", index, kind)))
    }

    /// Mirror what the event implies about the element before the engine
    /// sees it.
    fn mirror(&self, kind: BackendKind, ready: Option<bool>, paused: Option<bool>, time: Option<f64>) {
        let handle = match kind {
            BackendKind::Native => self.native.as_ref(),
            BackendKind::Widget => self.widget.as_ref(),
        };
        if let Some(handle) = handle {
            let mut state = handle.borrow_mut();
            if let Some(ready) = ready {
                state.ready = ready;
            }
            if let Some(paused) = paused {
                state.paused = paused;
            }
            if let Some(time) = time {
                state.time = time;
            }
        }
    }

    fn step(&mut self, index: usize, step: &TraceStep) -> TimelineResult<ReplayFrame> {
        let mut seek = None;
        let mut polled = None;
        let mut layout = None;

        match step {
            TraceStep::Props { props } => self.engine.set_props(props.clone()),
            TraceStep::AttachNative { ready } => {
                let (native, handle) = ScriptedBackend::new(BackendKind::Native);
                handle.borrow_mut().ready = *ready;
                self.native = Some(handle);
                self.engine.attach_native(Box::new(native));
            },
            TraceStep::AttachWidget { ready, fail } => match fail {
                Some(message) => {
                    self.engine
                        .attach_widget(&mut ScriptedWidgetFactory::failing(message.clone()));
                },
                None => {
                    let (widget, handle) = ScriptedBackend::new(BackendKind::Widget);
                    handle.borrow_mut().ready = *ready;
                    self.widget = Some(handle);
                    self.engine.attach_widget(&mut ScriptedWidgetFactory::with(widget));
                },
            },
            TraceStep::AttachChapterSink => {
                let (sink, _) = RecordingSink::new();
                self.engine.attach_chapter_sink(Box::new(sink));
            },
            TraceStep::Media { event } => {
                match event {
                    MediaEvent::LoadedMetadata { .. } => self.mirror(BackendKind::Native, Some(true), None, None),
                    MediaEvent::TimeUpdate { time } => self.mirror(BackendKind::Native, None, None, Some(*time)),
                    MediaEvent::Play => self.mirror(BackendKind::Native, None, Some(false), None),
                    MediaEvent::Pause | MediaEvent::Ended => {
                        self.mirror(BackendKind::Native, None, Some(true), None)
                    },
                    MediaEvent::DurationChange { .. } | MediaEvent::Error { .. } => {},
                }
                seek = self.engine.on_media_event(event.clone());
            },
            TraceStep::Widget { event } => {
                match event {
                    WidgetEvent::Ready => self.mirror(BackendKind::Widget, Some(true), None, None),
                    WidgetEvent::TimeUpdate { time } => self.mirror(BackendKind::Widget, None, None, Some(*time)),
                    WidgetEvent::Play => self.mirror(BackendKind::Widget, None, Some(false), None),
                    WidgetEvent::Pause => self.mirror(BackendKind::Widget, None, Some(true), None),
                }
                seek = self.engine.on_widget_event(event.clone());
            },
            TraceStep::Backend {
                backend,
                ready,
                paused,
                time,
                fail_seeks,
            } => {
                let handle = self.handle(*backend, index)?;
                if let Some(fail) = fail_seeks {
                    handle.borrow_mut().fail_seeks = *fail;
                }
                self.mirror(*backend, *ready, *paused, *time);
            },
            TraceStep::Poll => polled = self.engine.on_poll_tick(),
            TraceStep::Seek { target } => seek = Some(self.engine.seek(*target)),
            TraceStep::SeekChapter { index: chapter } => seek = self.engine.seek_to_chapter(*chapter),
            TraceStep::Layout => layout = Some(self.engine.layout()),
            TraceStep::Teardown => {
                self.engine.teardown();
                self.native = None;
                self.widget = None;
            },
        }

        Ok(ReplayFrame {
            step: index,
            kind: step.name().to_string(),
            state: self.engine.snapshot(),
            seek,
            polled,
            chapter_track: self.engine.chapter_track_url().map(str::to_string),
            layout,
        })
    }
}

/// Replay a trace against fresh scripted backends.
pub fn replay(trace: &Trace, config: EngineConfig) -> TimelineResult<Vec<ReplayFrame>> {
    let mut replayer = Replayer {
        engine: TimelineEngine::new(config, trace.props.clone()),
        native: None,
        widget: None,
    };

    let mut frames = Vec::with_capacity(trace.steps.len());
    for (index, step) in trace.steps.iter().enumerate() {
        log::trace!("[TIMELINE] Replaying step {}: {:?}", index, step);
        frames.push(replayer.step(index, step)?);
    }
    log::debug!("[TIMELINE] Replayed {} steps", frames.len());
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOOP_TRACE: &str = r#"{
        "props": { "videoSrc": "match.mp4", "duration": 30, "startTime": 5, "endTime": 15 },
        "steps": [
            { "step": "attachNative" },
            { "step": "media", "event": { "type": "loadedMetadata", "duration": 30 } },
            { "step": "media", "event": { "type": "play" } },
            { "step": "media", "event": { "type": "timeUpdate", "time": 15 } },
            { "step": "poll" },
            { "step": "layout" }
        ]
    }"#;

    #[test]
    fn test_parse_trace() {
        let trace = Trace::from_json_str(LOOP_TRACE).unwrap();
        assert_eq!(trace.steps.len(), 6);
        assert_eq!(trace.props.start_time, Some(5.0));
        assert_eq!(trace.steps[0], TraceStep::AttachNative { ready: false });
    }

    #[test]
    fn test_replay_loop_trace() {
        let trace = Trace::from_json_str(LOOP_TRACE).unwrap();
        let frames = replay(&trace, EngineConfig::default()).unwrap();
        assert_eq!(frames.len(), 6);

        assert_eq!(frames[1].seek.as_ref().map(|s| s.target()), Some(5.0));
        assert_eq!(frames[3].seek.as_ref().map(|s| s.target()), Some(5.0));
        assert_eq!(frames[3].state.current_time, 5.0);

        // The poll reads the element back at the segment start.
        assert_eq!(frames[4].polled, Some(5.0));
        assert_eq!(frames[5].layout.as_ref().map(|l| l.playhead), Some(0.0));
    }

    #[test]
    fn test_backend_step_requires_attachment() {
        let trace = Trace {
            props: PlayerProps::default(),
            steps: vec![TraceStep::Backend {
                backend: BackendKind::Widget,
                ready: Some(true),
                paused: None,
                time: None,
                fail_seeks: None,
            }],
        };
        let err = replay(&trace, EngineConfig::default()).unwrap_err();
        assert!(matches!(err, TimelineError::Trace(_)));
        assert!(err.to_string().contains("widget backend not attached"));
    }

    #[test]
    fn test_invalid_trace_json() {
        let err = Trace::from_json_str(r#"{"steps": [{"step": "rewind"}]}"#).unwrap_err();
        assert!(matches!(err, TimelineError::Trace(_)));
    }

    #[test]
    fn test_frame_omits_empty_fields() {
        let trace = Trace {
            props: PlayerProps::default(),
            steps: vec![TraceStep::Poll],
        };
        let frames = replay(&trace, EngineConfig::default()).unwrap();
        let json = serde_json::to_value(&frames[0]).unwrap();
        assert_eq!(json["kind"], "poll");
        assert!(json.get("seek").is_none());
        assert!(json.get("layout").is_none());
    }
}
