//! Playback backend abstraction.
//!
//! Two backends can drive playback at the same time: the native media
//! element and the third-party player widget wrapping it. Both sit behind
//! [`PlaybackBackend`] so the seek controller and the poll loop can treat
//! them uniformly and fall back from one to the other.
//!
//! Host resources with a lifecycle live here too:
//! - [`WidgetSlot`] owns the widget and destroys it exactly once
//! - [`ChapterTrack`] owns the published chapter-track URL

use super::clock::BackendStatus;
use super::types::BackendKind;
use crate::error::TimelineResult;

/// A seekable playback backend.
pub trait PlaybackBackend {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Whether the backend accepts seeks.
    fn is_ready(&self) -> bool;

    /// Whether playback is paused.
    fn is_paused(&self) -> bool;

    /// Current playback position, if the backend can report one.
    fn current_time(&self) -> Option<f64>;

    /// Move the playback position.
    fn seek(&mut self, time: f64) -> TimelineResult<()>;

    /// Release host resources. Called at most once per backend.
    fn destroy(&mut self) -> TimelineResult<()> {
        Ok(())
    }

    /// Snapshot used by the poll plan.
    fn status(&self) -> BackendStatus {
        BackendStatus {
            ready: self.is_ready(),
            paused: self.is_paused(),
        }
    }
}

/// Builds the third-party widget around an attached media element.
pub trait WidgetFactory {
    fn create(&mut self) -> TimelineResult<Box<dyn PlaybackBackend>>;
}

// ============================================================================
// Widget slot
// ============================================================================

/// Owned widget instance.
///
/// Empty when construction failed or after teardown. The widget is destroyed
/// exactly once, either through [`WidgetSlot::destroy`] or on drop; destroy
/// failures are logged and swallowed.
#[derive(Default)]
pub struct WidgetSlot {
    widget: Option<Box<dyn PlaybackBackend>>,
}

impl WidgetSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Construct the widget, degrading to an empty slot on failure.
    pub fn acquire(factory: &mut dyn WidgetFactory) -> Self {
        match factory.create() {
            Ok(widget) => {
                log::info!("[TIMELINE] Player widget created");
                Self {
                    widget: Some(widget),
                }
            },
            Err(e) => {
                log::warn!("[TIMELINE] Player widget unavailable, using native playback: {}", e);
                Self::empty()
            },
        }
    }

    pub fn is_live(&self) -> bool {
        self.widget.is_some()
    }

    pub fn get(&self) -> Option<&dyn PlaybackBackend> {
        self.widget.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut Box<dyn PlaybackBackend>> {
        self.widget.as_mut()
    }

    /// Destroy the widget if it is still alive.
    ///
    /// Returns `true` when this call performed the destruction.
    pub fn destroy(&mut self) -> bool {
        let Some(mut widget) = self.widget.take() else {
            return false;
        };
        if let Err(e) = widget.destroy() {
            log::warn!("[TIMELINE] Widget destroy failed (ignored): {}", e);
        } else {
            log::debug!("[TIMELINE] Player widget destroyed");
        }
        true
    }
}

impl Drop for WidgetSlot {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for WidgetSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetSlot")
            .field("live", &self.is_live())
            .finish()
    }
}

// ============================================================================
// Backend pair
// ============================================================================

/// The native element and the widget, the only playback resources the
/// engine mutates.
#[derive(Default)]
pub struct BackendPair {
    native: Option<Box<dyn PlaybackBackend>>,
    widget: WidgetSlot,
}

impl BackendPair {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_native(&mut self, native: Box<dyn PlaybackBackend>) {
        self.native = Some(native);
    }

    /// Replace the widget; the previous instance is destroyed first.
    pub fn set_widget(&mut self, widget: WidgetSlot) {
        self.widget.destroy();
        self.widget = widget;
    }

    pub fn has_native(&self) -> bool {
        self.native.is_some()
    }

    pub fn has_widget(&self) -> bool {
        self.widget.is_live()
    }

    pub fn get(&self, kind: BackendKind) -> Option<&dyn PlaybackBackend> {
        match kind {
            BackendKind::Native => self.native.as_deref(),
            BackendKind::Widget => self.widget.get(),
        }
    }

    pub fn get_mut(&mut self, kind: BackendKind) -> Option<&mut Box<dyn PlaybackBackend>> {
        match kind {
            BackendKind::Native => self.native.as_mut(),
            BackendKind::Widget => self.widget.get_mut(),
        }
    }

    pub fn status(&self, kind: BackendKind) -> Option<BackendStatus> {
        self.get(kind).map(|b| b.status())
    }

    /// Whether `kind` is attached and ready.
    pub fn is_ready(&self, kind: BackendKind) -> bool {
        self.get(kind).is_some_and(|b| b.is_ready())
    }

    pub fn any_ready(&self) -> bool {
        self.is_ready(BackendKind::Widget) || self.is_ready(BackendKind::Native)
    }

    /// Attached backends in seek preference order (widget first).
    pub fn attached(&self) -> Vec<BackendKind> {
        [BackendKind::Widget, BackendKind::Native]
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }

    /// Destroy the widget and detach both backends.
    pub fn teardown(&mut self) {
        self.widget.destroy();
        self.native = None;
    }
}

impl std::fmt::Debug for BackendPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendPair")
            .field("native", &self.has_native())
            .field("widget", &self.widget)
            .finish()
    }
}

// ============================================================================
// Chapter track
// ============================================================================

/// Host-side publisher for the WebVTT chapter track (an object URL in the
/// browser).
pub trait ChapterTrackSink {
    /// Publish cue text, returning the URL it is reachable under.
    fn publish(&mut self, vtt: &str) -> TimelineResult<String>;

    /// Release a previously published URL.
    fn revoke(&mut self, url: &str) -> TimelineResult<()>;
}

/// The currently published chapter track.
///
/// At most one URL is live; it is revoked before a replacement is published
/// and on [`ChapterTrack::clear`]. [`ChapterTrack::detach`] also drops the
/// sink so hosts can remove their track element.
#[derive(Default)]
pub struct ChapterTrack {
    sink: Option<Box<dyn ChapterTrackSink>>,
    url: Option<String>,
    vtt: Option<String>,
}

impl ChapterTrack {
    /// Attach a sink, releasing anything published through the old one.
    pub fn attach(&mut self, sink: Box<dyn ChapterTrackSink>) {
        self.clear();
        self.sink = Some(sink);
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Publish `vtt`, or revoke the current track when `None`.
    ///
    /// Unchanged cue text is not republished.
    pub fn update(&mut self, vtt: Option<String>) {
        if vtt.is_some() && vtt == self.vtt && self.url.is_some() {
            return;
        }
        self.clear();

        let (Some(sink), Some(text)) = (self.sink.as_mut(), vtt) else {
            return;
        };
        match sink.publish(&text) {
            Ok(url) => {
                log::debug!("[CHAPTERS] Published chapter track {}", url);
                self.url = Some(url);
                self.vtt = Some(text);
            },
            Err(e) => log::warn!("[CHAPTERS] Failed to publish chapter track: {}", e),
        }
    }

    /// Revoke the published URL, if any.
    pub fn clear(&mut self) {
        self.vtt = None;
        let Some(url) = self.url.take() else {
            return;
        };
        if let Some(sink) = self.sink.as_mut() {
            match sink.revoke(&url) {
                Ok(()) => log::debug!("[CHAPTERS] Revoked chapter track {}", url),
                Err(e) => log::warn!("[CHAPTERS] Failed to revoke {}: {}", url, e),
            }
        }
    }
}

impl ChapterTrack {
    /// Revoke the published URL and release the sink.
    pub fn detach(&mut self) {
        self.clear();
        if self.sink.take().is_some() {
            log::debug!("[CHAPTERS] Chapter sink released");
        }
    }
}

impl Drop for ChapterTrack {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for ChapterTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapterTrack")
            .field("sink", &self.sink.is_some())
            .field("url", &self.url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TimelineError;
    use crate::timeline::scripted::{RecordingSink, ScriptedBackend, ScriptedWidgetFactory};

    #[test]
    fn test_widget_destroyed_once() {
        let (widget, handle) = ScriptedBackend::new(BackendKind::Widget);
        let mut slot = WidgetSlot::acquire(&mut ScriptedWidgetFactory::with(widget));
        assert!(slot.is_live());

        assert!(slot.destroy());
        assert!(!slot.destroy());
        drop(slot);
        assert_eq!(handle.borrow().destroy_calls, 1);
    }

    #[test]
    fn test_widget_destroyed_on_drop() {
        let (widget, handle) = ScriptedBackend::new(BackendKind::Widget);
        {
            let _slot = WidgetSlot::acquire(&mut ScriptedWidgetFactory::with(widget));
        }
        assert_eq!(handle.borrow().destroy_calls, 1);
    }

    #[test]
    fn test_widget_destroy_failure_swallowed() {
        let (widget, handle) = ScriptedBackend::new(BackendKind::Widget);
        handle.borrow_mut().fail_destroy = true;
        let mut slot = WidgetSlot::acquire(&mut ScriptedWidgetFactory::with(widget));

        assert!(slot.destroy());
        drop(slot);
        assert_eq!(handle.borrow().destroy_calls, 1);
    }

    #[test]
    fn test_widget_factory_failure_leaves_empty_slot() {
        let mut factory = ScriptedWidgetFactory::failing("plyr is not defined");
        let slot = WidgetSlot::acquire(&mut factory);
        assert!(!slot.is_live());
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_pair_preference_order() {
        let (native, _) = ScriptedBackend::new(BackendKind::Native);
        let (widget, _) = ScriptedBackend::new(BackendKind::Widget);
        let mut pair = BackendPair::new();
        assert!(pair.attached().is_empty());

        pair.set_native(Box::new(native));
        pair.set_widget(WidgetSlot::acquire(&mut ScriptedWidgetFactory::with(widget)));
        assert_eq!(pair.attached(), vec![BackendKind::Widget, BackendKind::Native]);
    }

    #[test]
    fn test_pair_replacing_widget_destroys_previous() {
        let (first, first_handle) = ScriptedBackend::new(BackendKind::Widget);
        let (second, second_handle) = ScriptedBackend::new(BackendKind::Widget);
        let mut pair = BackendPair::new();

        pair.set_widget(WidgetSlot::acquire(&mut ScriptedWidgetFactory::with(first)));
        pair.set_widget(WidgetSlot::acquire(&mut ScriptedWidgetFactory::with(second)));
        assert_eq!(first_handle.borrow().destroy_calls, 1);
        assert_eq!(second_handle.borrow().destroy_calls, 0);

        pair.teardown();
        pair.teardown();
        assert_eq!(second_handle.borrow().destroy_calls, 1);
        assert!(!pair.has_widget());
    }

    #[test]
    fn test_chapter_track_revokes_on_replace_and_clear() {
        let (sink, log) = RecordingSink::new();
        let mut track = ChapterTrack::default();
        track.attach(Box::new(sink));

        track.update(Some("WEBVTT\n\nA".to_string()));
        let first = track.url().map(str::to_string);
        track.update(Some("WEBVTT\n\nB".to_string()));
        track.clear();

        let log = log.borrow();
        assert_eq!(log.published.len(), 2);
        assert_eq!(log.revoked.len(), 2);
        assert_eq!(log.revoked.first(), first.as_ref());
        assert!(track.url().is_none());
    }

    #[test]
    fn test_chapter_track_skips_identical_content() {
        let (sink, log) = RecordingSink::new();
        let mut track = ChapterTrack::default();
        track.attach(Box::new(sink));

        track.update(Some("WEBVTT\n\nA".to_string()));
        track.update(Some("WEBVTT\n\nA".to_string()));
        assert_eq!(log.borrow().published.len(), 1);
        assert!(log.borrow().revoked.is_empty());
    }

    #[test]
    fn test_chapter_track_revoked_on_drop() {
        let (sink, log) = RecordingSink::new();
        {
            let mut track = ChapterTrack::default();
            track.attach(Box::new(sink));
            track.update(Some("WEBVTT\n\nA".to_string()));
        }
        assert_eq!(log.borrow().revoked.len(), 1);
    }

    #[test]
    fn test_chapter_track_detach_releases_sink() {
        let (sink, log) = RecordingSink::new();
        let mut track = ChapterTrack::default();
        track.attach(Box::new(sink));
        track.update(Some("WEBVTT\n\nA".to_string()));

        track.detach();
        assert!(log.borrow().released);
        assert_eq!(log.borrow().revoked.len(), 1);
        assert!(track.url().is_none());

        // Without a sink nothing is published.
        track.update(Some("WEBVTT\n\nB".to_string()));
        assert_eq!(log.borrow().published.len(), 1);
    }

    #[test]
    fn test_chapter_track_publish_failure_logged() {
        let (sink, log) = RecordingSink::new();
        log.borrow_mut().fail_publish = true;
        let mut track = ChapterTrack::default();
        track.attach(Box::new(sink));

        track.update(Some("WEBVTT\n\nA".to_string()));
        assert!(track.url().is_none());
    }

    #[test]
    fn test_default_status() {
        let (native, handle) = ScriptedBackend::new(BackendKind::Native);
        handle.borrow_mut().ready = true;
        let status = native.status();
        assert!(status.ready);
        assert!(status.paused);

        let err: TimelineError = TimelineError::backend(native.kind(), "x");
        assert!(err.to_string().starts_with("native"));
    }
}
