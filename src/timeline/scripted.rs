//! Deterministic in-memory backends.
//!
//! Used by trace replay and by tests. Each backend shares its state through a
//! [`ScriptHandle`] so the caller can drive it (advance time, flip readiness,
//! inject failures) and inspect what the engine did to it after the backend
//! has been boxed into the engine.

use std::cell::RefCell;
use std::rc::Rc;

use super::backend::{ChapterTrackSink, PlaybackBackend, WidgetFactory};
use super::types::BackendKind;
use crate::error::{TimelineError, TimelineResult};

/// Observable state of a [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedState {
    pub ready: bool,
    pub paused: bool,
    pub time: f64,
    pub fail_seeks: bool,
    pub fail_destroy: bool,
    /// Every seek target received, including failed ones.
    pub seeks: Vec<f64>,
    pub destroy_calls: u32,
}

impl Default for ScriptedState {
    fn default() -> Self {
        Self {
            ready: false,
            paused: true,
            time: 0.0,
            fail_seeks: false,
            fail_destroy: false,
            seeks: Vec::new(),
            destroy_calls: 0,
        }
    }
}

pub type ScriptHandle = Rc<RefCell<ScriptedState>>;

/// A backend whose behavior is fully controlled by its handle.
#[derive(Debug)]
pub struct ScriptedBackend {
    kind: BackendKind,
    state: ScriptHandle,
}

impl ScriptedBackend {
    pub fn new(kind: BackendKind) -> (Self, ScriptHandle) {
        let state = Rc::new(RefCell::new(ScriptedState::default()));
        (
            Self {
                kind,
                state: Rc::clone(&state),
            },
            state,
        )
    }
}

impl PlaybackBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn is_ready(&self) -> bool {
        self.state.borrow().ready
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn current_time(&self) -> Option<f64> {
        Some(self.state.borrow().time)
    }

    fn seek(&mut self, time: f64) -> TimelineResult<()> {
        let mut state = self.state.borrow_mut();
        state.seeks.push(time);
        if state.fail_seeks {
            return Err(TimelineError::backend(self.kind, "scripted seek failure"));
        }
        state.time = time;
        Ok(())
    }

    fn destroy(&mut self) -> TimelineResult<()> {
        let mut state = self.state.borrow_mut();
        state.destroy_calls += 1;
        if state.fail_destroy {
            return Err(TimelineError::backend(self.kind, "scripted destroy failure"));
        }
        Ok(())
    }
}

/// Hands out a prepared widget once, or fails construction.
#[derive(Debug, Default)]
pub struct ScriptedWidgetFactory {
    widget: Option<ScriptedBackend>,
    failure: Option<String>,
}

impl ScriptedWidgetFactory {
    pub fn with(widget: ScriptedBackend) -> Self {
        Self {
            widget: Some(widget),
            failure: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            widget: None,
            failure: Some(message.into()),
        }
    }
}

impl WidgetFactory for ScriptedWidgetFactory {
    fn create(&mut self) -> TimelineResult<Box<dyn PlaybackBackend>> {
        if let Some(message) = &self.failure {
            return Err(TimelineError::WidgetInit(message.clone()));
        }
        match self.widget.take() {
            Some(widget) => Ok(Box::new(widget)),
            None => Err(TimelineError::WidgetInit("widget already constructed".to_string())),
        }
    }
}

/// What a [`RecordingSink`] was asked to do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkLog {
    /// `(url, vtt)` per publish.
    pub published: Vec<(String, String)>,
    pub revoked: Vec<String>,
    pub fail_publish: bool,
    /// Set once the sink has been dropped by its owner.
    pub released: bool,
}

impl SinkLog {
    /// URLs published and not yet revoked.
    pub fn live_urls(&self) -> Vec<&str> {
        self.published
            .iter()
            .map(|(url, _)| url.as_str())
            .filter(|url| !self.revoked.iter().any(|r| r == url))
            .collect()
    }
}

/// Chapter-track sink that hands out `blob:chapters/<n>` URLs.
#[derive(Debug)]
pub struct RecordingSink {
    log: Rc<RefCell<SinkLog>>,
    next_id: u32,
}

impl RecordingSink {
    pub fn new() -> (Self, Rc<RefCell<SinkLog>>) {
        let log = Rc::new(RefCell::new(SinkLog::default()));
        (
            Self {
                log: Rc::clone(&log),
                next_id: 0,
            },
            log,
        )
    }
}

impl ChapterTrackSink for RecordingSink {
    fn publish(&mut self, vtt: &str) -> TimelineResult<String> {
        let mut log = self.log.borrow_mut();
        if log.fail_publish {
            return Err(TimelineError::ChapterTrack("scripted publish failure".to_string()));
        }
        self.next_id += 1;
        let url = format!("blob:chapters/{}", self.next_id);
        log.published.push((url.clone(), vtt.to_string()));
        Ok(url)
    }

    fn revoke(&mut self, url: &str) -> TimelineResult<()> {
        self.log.borrow_mut().revoked.push(url.to_string());
        Ok(())
    }
}

impl Drop for RecordingSink {
    fn drop(&mut self) {
        self.log.borrow_mut().released = true;
    }
}
