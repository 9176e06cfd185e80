//! Timeline engine.
//!
//! Owns the single playback state for one player instance and is the only
//! place that mutates playback backends. Hosts feed it props, media events,
//! widget events and poll ticks; the rendering layer reads
//! [`TimelineEngine::snapshot`] and [`TimelineEngine::layout`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::backend::{
    BackendPair, ChapterTrack, ChapterTrackSink, PlaybackBackend, WidgetFactory, WidgetSlot,
};
use super::chapters::normalize_chapters_with;
use super::clock::{ClockCommand, ClockEvent, ClockState, PollPlan, Reduction};
use super::duration::{resolve_duration, ResolvedDuration};
use super::layout::{project_layout, LayoutInput, TimelineLayout};
use super::seek::{SeekController, SeekOutcome};
use super::types::{BackendKind, ChapterSpan, EngineState, PlaybackSegment, PlayerProps, SampleSource, TimeSample};
use super::vtt::chapter_vtt;
use crate::config::EngineConfig;

/// Events from the native media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub enum MediaEvent {
    /// `loadedmetadata`; `None` when the element reports `NaN`.
    LoadedMetadata { duration: Option<f64> },
    /// `durationchange`.
    DurationChange { duration: Option<f64> },
    /// `timeupdate`.
    TimeUpdate { time: f64 },
    Play,
    Pause,
    Ended,
    /// `error`, with the element's error message.
    Error { message: String },
}

/// Events from the player widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub enum WidgetEvent {
    Ready,
    TimeUpdate { time: f64 },
    Play,
    Pause,
}

fn same_time(a: Option<f64>, b: Option<f64>) -> bool {
    a.map(f64::to_bits) == b.map(f64::to_bits)
}

/// Playback engine for one player instance.
#[derive(Debug)]
pub struct TimelineEngine {
    config: EngineConfig,
    props: PlayerProps,
    clock: ClockState,
    seeks: SeekController,
    backends: BackendPair,
    track: ChapterTrack,
    media_duration: Option<f64>,
}

impl TimelineEngine {
    pub fn new(mut config: EngineConfig, props: PlayerProps) -> Self {
        config.validate();
        let mut engine = Self {
            config,
            props,
            clock: ClockState::default(),
            seeks: SeekController::new(),
            backends: BackendPair::new(),
            track: ChapterTrack::default(),
            media_duration: None,
        };
        engine.sync_duration();
        if engine.props.open && engine.props.start_time.is_some() {
            engine.seek_to_start();
        }
        log::debug!("[TIMELINE] Engine created for {:?}", engine.props.video_src);
        engine
    }

    // ========================================================================
    // Derived state
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn props(&self) -> &PlayerProps {
        &self.props
    }

    /// Authoritative duration, recomputed from the current inputs.
    pub fn resolved_duration(&self) -> ResolvedDuration {
        resolve_duration(self.props.duration, self.media_duration)
    }

    pub fn duration(&self) -> f64 {
        self.resolved_duration().seconds
    }

    /// The active trim window, if playback is trimmed.
    pub fn segment(&self) -> Option<PlaybackSegment> {
        PlaybackSegment::from_bounds(self.props.start_time, self.props.end_time, self.duration())
    }

    /// Normalized chapters for the current duration.
    pub fn chapters(&self) -> Vec<ChapterSpan> {
        normalize_chapters_with(&self.props.chapters, self.duration(), &self.config)
    }

    pub fn snapshot(&self) -> EngineState {
        let duration = self.resolved_duration();
        EngineState {
            duration: duration.seconds,
            current_time: self.clock.current_time,
            backend_ready: self.backends.any_ready(),
            phase: self.clock.phase,
            pending_seek: self.seeks.pending(),
            duration_source: duration.source,
        }
    }

    pub fn layout(&self) -> TimelineLayout {
        let chapters = self.chapters();
        let segment = self.segment();
        project_layout(&LayoutInput {
            duration: self.duration(),
            current_time: self.clock.current_time,
            segment: segment.as_ref(),
            chapters: &chapters,
            mode: self.config.render_mode,
            min_band_width_pct: self.config.min_band_width_pct,
        })
    }

    /// URL of the published chapter track.
    pub fn chapter_track_url(&self) -> Option<&str> {
        self.track.url()
    }

    /// Whether the host should keep the poll timer running.
    pub fn wants_polling(&self) -> bool {
        self.props.open && (self.backends.has_native() || self.backends.has_widget())
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        self.config.poll_interval()
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    /// Apply new props from the surrounding UI.
    pub fn set_props(&mut self, props: PlayerProps) {
        let previous = std::mem::replace(&mut self.props, props);

        let source_changed = previous.video_src != self.props.video_src;
        if source_changed {
            log::info!(
                "[TIMELINE] Source changed {:?} -> {:?}, resetting",
                previous.video_src,
                self.props.video_src
            );
            self.reset_source();
        }

        if !self.props.open {
            if previous.open {
                log::debug!("[TIMELINE] Player closed");
                self.teardown();
            }
            return;
        }

        let duration_before = self.duration();
        self.sync_duration();

        let reopened = !previous.open;
        let start_changed = !same_time(previous.start_time, self.props.start_time);
        if start_changed || ((reopened || source_changed) && self.props.start_time.is_some()) {
            self.seek_to_start();
        }

        if previous.chapters != self.props.chapters || duration_before != self.duration() {
            self.refresh_chapter_track();
        }
    }

    /// Attach the native media element.
    pub fn attach_native(&mut self, native: Box<dyn PlaybackBackend>) {
        let ready = native.is_ready();
        self.backends.set_native(native);
        self.dispatch(ClockEvent::Attach);
        log::debug!("[TIMELINE] Native backend attached (ready: {})", ready);
        if ready {
            self.dispatch(ClockEvent::Ready);
            self.on_backend_ready();
        }
    }

    /// Construct the player widget. Returns `false` when construction failed
    /// and the engine continues with native playback only.
    pub fn attach_widget(&mut self, factory: &mut dyn WidgetFactory) -> bool {
        let slot = WidgetSlot::acquire(factory);
        if !slot.is_live() {
            return false;
        }
        let ready = slot.get().is_some_and(|w| w.is_ready());
        self.backends.set_widget(slot);
        self.dispatch(ClockEvent::Attach);
        if ready {
            self.dispatch(ClockEvent::Ready);
            self.on_backend_ready();
        }
        true
    }

    /// Attach the host's chapter-track publisher.
    pub fn attach_chapter_sink(&mut self, sink: Box<dyn ChapterTrackSink>) {
        self.track.attach(sink);
        self.refresh_chapter_track();
    }

    /// Handle a native media event. Returns the seek issued in response, if
    /// any (pending-seek replay or segment loop-back).
    pub fn on_media_event(&mut self, event: MediaEvent) -> Option<SeekOutcome> {
        match event {
            MediaEvent::LoadedMetadata { duration } => {
                self.media_duration = duration;
                self.sync_duration();
                self.dispatch(ClockEvent::Ready);
                self.on_backend_ready()
            },
            MediaEvent::DurationChange { duration } => {
                let before = self.duration();
                self.media_duration = duration;
                self.sync_duration();
                if before != self.duration() {
                    self.refresh_chapter_track();
                }
                None
            },
            MediaEvent::TimeUpdate { time } => {
                self.dispatch(ClockEvent::Sample(TimeSample::new(SampleSource::Native, time)))
            },
            MediaEvent::Play => self.dispatch(ClockEvent::Play),
            MediaEvent::Pause => self.dispatch(ClockEvent::Pause),
            MediaEvent::Ended => self.dispatch(ClockEvent::Ended),
            MediaEvent::Error { message } => {
                log::error!("[TIMELINE] Media error for {:?}: {}", self.props.video_src, message);
                None
            },
        }
    }

    /// Handle a widget event.
    pub fn on_widget_event(&mut self, event: WidgetEvent) -> Option<SeekOutcome> {
        if !self.backends.has_widget() {
            log::trace!("[TIMELINE] Widget event {:?} without a live widget", event);
            return None;
        }
        match event {
            WidgetEvent::Ready => {
                self.dispatch(ClockEvent::Ready);
                self.on_backend_ready()
            },
            WidgetEvent::TimeUpdate { time } => {
                self.dispatch(ClockEvent::Sample(TimeSample::new(SampleSource::Widget, time)))
            },
            WidgetEvent::Play => self.dispatch(ClockEvent::Play),
            WidgetEvent::Pause => self.dispatch(ClockEvent::Pause),
        }
    }

    /// Poll fallback tick. Reads the active backend and feeds the reading
    /// to the clock; returns the polled time, if any.
    pub fn on_poll_tick(&mut self) -> Option<f64> {
        let plan = PollPlan::choose(
            self.backends.status(BackendKind::Widget),
            self.backends.status(BackendKind::Native),
        );
        let kind = plan.target?;
        let time = self.backends.get(kind).and_then(|b| b.current_time())?;
        self.dispatch(ClockEvent::Sample(TimeSample::new(SampleSource::Poll, time)));
        Some(time)
    }

    /// Seek every ready backend, queueing when none is ready.
    pub fn seek(&mut self, target: f64) -> SeekOutcome {
        let outcome = self.seeks.request(target, self.duration(), &mut self.backends);
        log::debug!("[TIMELINE] Seek {:.3}s -> {:?}", target, outcome);
        self.record_seek(&outcome);
        outcome
    }

    /// Seek to the visible start of a normalized chapter.
    pub fn seek_to_chapter(&mut self, index: usize) -> Option<SeekOutcome> {
        let chapters = self.chapters();
        let Some(chapter) = chapters.get(index) else {
            log::warn!("[TIMELINE] No chapter at index {} ({} chapters)", index, chapters.len());
            return None;
        };
        let target = match self.segment() {
            Some(seg) => chapter.start.max(seg.start),
            None => chapter.start,
        };
        log::debug!("[TIMELINE] Chapter {:?} selected", chapter.title);
        Some(self.seek(target))
    }

    /// Stop everything: destroy the widget, detach backends, drop the
    /// pending seek, revoke the chapter track and release its sink.
    pub fn teardown(&mut self) {
        self.backends.teardown();
        self.seeks.clear();
        self.track.detach();
        self.dispatch(ClockEvent::Reset);
        self.sync_duration();
        log::debug!("[TIMELINE] Torn down");
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn loop_segment(&self) -> Option<PlaybackSegment> {
        if self.config.loop_segment {
            self.segment()
        } else {
            None
        }
    }

    /// Run one clock reduction and execute its command.
    fn dispatch(&mut self, event: ClockEvent) -> Option<SeekOutcome> {
        let segment = self.loop_segment();
        let Reduction { state, command } = self.clock.reduce(event, segment.as_ref());
        self.clock = state;

        match command {
            Some(ClockCommand::LoopBack { target, from }) => {
                let outcome = self.seeks.request(target, self.duration(), &mut self.backends);
                log::debug!("[TIMELINE] Loop-back -> {:?}", outcome);
                if let SeekOutcome::Failed { .. } = outcome {
                    self.clock = self
                        .clock
                        .reduce(ClockEvent::LoopBackFailed(from), segment.as_ref())
                        .state;
                }
                Some(outcome)
            },
            None => None,
        }
    }

    fn record_seek(&mut self, outcome: &SeekOutcome) {
        match outcome {
            SeekOutcome::Applied { target, .. } | SeekOutcome::Queued { target } => {
                self.dispatch(ClockEvent::Seeked(*target));
            },
            SeekOutcome::Failed { .. } => {},
        }
    }

    fn seek_to_start(&mut self) {
        let start = self.props.start_or_zero();
        self.seek(start);
    }

    fn sync_duration(&mut self) {
        let duration = self.duration();
        if duration != self.clock.duration {
            log::debug!("[TIMELINE] Duration {:.3}s ({:?})", duration, self.resolved_duration().source);
            self.dispatch(ClockEvent::DurationChanged(duration));
        }
    }

    fn on_backend_ready(&mut self) -> Option<SeekOutcome> {
        let outcome = self.seeks.on_backend_ready(self.duration(), &mut self.backends);
        if let Some(outcome) = &outcome {
            self.record_seek(outcome);
        }
        self.refresh_chapter_track();
        outcome
    }

    fn refresh_chapter_track(&mut self) {
        if !self.backends.any_ready() {
            return;
        }
        let vtt = chapter_vtt(&self.chapters());
        self.track.update(vtt);
    }

    fn reset_source(&mut self) {
        self.backends.set_widget(WidgetSlot::empty());
        self.seeks.clear();
        self.track.clear();
        self.media_duration = None;
        self.dispatch(ClockEvent::Reset);
        if self.backends.has_native() {
            self.dispatch(ClockEvent::Attach);
        }
        self.sync_duration();
    }
}
