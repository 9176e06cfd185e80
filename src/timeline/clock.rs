//! Clock reconciliation.
//!
//! Three sources report playback time independently:
//! - native media `timeupdate` events
//! - the player widget's own `timeupdate` events
//! - a fixed-interval poll of whichever backend is running
//!
//! They are merged by [`ClockState::reduce`], a pure reducer: the most recent
//! sample wins regardless of source. The reducer also owns the segment
//! loop-back decision so the boundary check happens in the same update as the
//! time mutation.
//!
//! ```text
//! Uninitialized ──Attach──▶ Loading ──Ready──▶ Ready ──Play──▶ Playing
//!       ▲                                                   ◀──Pause/Ended── Paused
//!       └──────────────────────── Reset (from anywhere) ─────────────────────────┘
//! ```

use super::types::{BackendKind, PlaybackPhase, PlaybackSegment, TimeSample};

/// Inputs to the reducer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    /// A media source was attached to a backend.
    Attach,
    /// Metadata loaded or the widget signalled readiness.
    Ready,
    /// Playback started.
    Play,
    /// Playback paused.
    Pause,
    /// Playback reached the end of the media.
    Ended,
    /// A time observation from any source.
    Sample(TimeSample),
    /// An explicit seek was issued to the backends.
    Seeked(f64),
    /// The resolved duration changed.
    DurationChanged(f64),
    /// No backend accepted the loop-back seek; carries the sample time that
    /// triggered it.
    LoopBackFailed(f64),
    /// Source switched or engine torn down.
    Reset,
}

/// Side effect requested by a reduction. Executed by the engine through the
/// seek controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockCommand {
    /// Seek every active backend back to the segment start. `from` is the
    /// sample time that crossed the segment end.
    LoopBack { target: f64, from: f64 },
}

/// Reconciled clock state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClockState {
    pub phase: PlaybackPhase,
    pub current_time: f64,
    /// Resolved duration used for clamping (0 = unknown).
    pub duration: f64,
    /// Set after a loop-back until time drops below the segment end again.
    pub loop_latched: bool,
}

/// Result of one reduction step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reduction {
    pub state: ClockState,
    pub command: Option<ClockCommand>,
}

impl Reduction {
    fn state(state: ClockState) -> Self {
        Self {
            state,
            command: None,
        }
    }
}

impl ClockState {
    /// Fresh state for a known duration.
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration: sanitize_duration(duration),
            ..Self::default()
        }
    }

    /// Clamp a time into `[0, duration]`; only the lower bound applies
    /// while the duration is unknown.
    pub fn clamp_time(&self, time: f64) -> f64 {
        let time = time.max(0.0);
        if self.duration > 0.0 {
            time.min(self.duration)
        } else {
            time
        }
    }

    /// Apply one event.
    ///
    /// `segment` is the active trim window; `None` disables loop-back.
    pub fn reduce(&self, event: ClockEvent, segment: Option<&PlaybackSegment>) -> Reduction {
        let mut next = *self;

        match event {
            ClockEvent::Attach => {
                if self.phase == PlaybackPhase::Uninitialized {
                    next.phase = PlaybackPhase::Loading;
                } else {
                    log::debug!("[CLOCK] Attach ignored in phase {:?}", self.phase);
                }
            },
            ClockEvent::Ready => match self.phase {
                PlaybackPhase::Loading => next.phase = PlaybackPhase::Ready,
                PlaybackPhase::Uninitialized => {
                    log::debug!("[CLOCK] Ready ignored before any source is attached");
                },
                _ => {},
            },
            ClockEvent::Play => match self.phase {
                PlaybackPhase::Ready | PlaybackPhase::Paused => next.phase = PlaybackPhase::Playing,
                PlaybackPhase::Playing => {},
                other => log::debug!("[CLOCK] Play ignored in phase {:?}", other),
            },
            ClockEvent::Pause | ClockEvent::Ended => match self.phase {
                PlaybackPhase::Playing => next.phase = PlaybackPhase::Paused,
                PlaybackPhase::Paused => {},
                other => log::debug!("[CLOCK] {:?} ignored in phase {:?}", event, other),
            },
            ClockEvent::Sample(sample) => return self.apply_sample(sample, segment),
            ClockEvent::Seeked(target) => {
                if !target.is_finite() {
                    log::debug!("[CLOCK] Dropping non-finite seek target");
                    return Reduction::state(next);
                }
                next.current_time = self.clamp_time(target);
                let below_end = segment
                    .and_then(|seg| seg.end)
                    .map_or(true, |end| next.current_time < end);
                if below_end {
                    next.loop_latched = false;
                }
            },
            ClockEvent::DurationChanged(duration) => {
                next.duration = sanitize_duration(duration);
                next.current_time = next.clamp_time(self.current_time);
            },
            ClockEvent::LoopBackFailed(from) => {
                // Backends are still past the end: release the latch so the
                // next crossing sample retries.
                if from.is_finite() {
                    next.current_time = self.clamp_time(from);
                }
                next.loop_latched = false;
                log::warn!("[CLOCK] Loop-back from {:.3}s failed, will retry", from);
            },
            ClockEvent::Reset => {
                if self.phase != PlaybackPhase::Uninitialized {
                    log::debug!("[CLOCK] Reset from phase {:?}", self.phase);
                }
                next = ClockState::default();
            },
        }

        Reduction::state(next)
    }

    fn apply_sample(&self, sample: TimeSample, segment: Option<&PlaybackSegment>) -> Reduction {
        let mut next = *self;

        if self.phase == PlaybackPhase::Uninitialized {
            log::trace!("[CLOCK] Dropping {:?} sample, no source attached", sample.source);
            return Reduction::state(next);
        }
        if !sample.time.is_finite() {
            log::debug!("[CLOCK] Dropping non-finite {:?} sample", sample.source);
            return Reduction::state(next);
        }

        let time = self.clamp_time(sample.time);
        let end = segment.and_then(|seg| seg.end.map(|end| (seg.start, end)));

        match end {
            Some((start, end)) if time >= end => {
                if self.loop_latched {
                    // Stale sample from before the loop-back seek landed.
                    next.current_time = time;
                    return Reduction::state(next);
                }
                log::debug!(
                    "[CLOCK] {:?} sample {:.3}s reached segment end {:.3}s, looping to {:.3}s",
                    sample.source,
                    time,
                    end,
                    start
                );
                next.current_time = start;
                next.loop_latched = true;
                Reduction {
                    state: next,
                    command: Some(ClockCommand::LoopBack { target: start, from: time }),
                }
            },
            _ => {
                next.current_time = time;
                next.loop_latched = false;
                Reduction::state(next)
            },
        }
    }
}

fn sanitize_duration(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

// ============================================================================
// Poll fallback
// ============================================================================

/// What the poll loop can see of one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendStatus {
    pub ready: bool,
    pub paused: bool,
}

/// Which backend the poll fallback reads on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPlan {
    pub target: Option<BackendKind>,
}

impl PollPlan {
    /// Prefer the widget while it is ready and playing, then the native
    /// element while it is not paused.
    pub fn choose(widget: Option<BackendStatus>, native: Option<BackendStatus>) -> Self {
        let target = match (widget, native) {
            (Some(w), _) if w.ready && !w.paused => Some(BackendKind::Widget),
            (_, Some(n)) if !n.paused => Some(BackendKind::Native),
            _ => None,
        };
        Self { target }
    }
}
