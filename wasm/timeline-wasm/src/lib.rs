//! WASM timeline binding
//!
//! Runs the timeline engine next to the `<video>` element so the player UI
//! never waits on a round trip. The host wires DOM and widget events into
//! [`WasmTimeline`] and renders the layout it returns.

use std::cell::Cell;
use std::rc::Rc;

use ballskicker_timeline::timeline::{
    BackendKind, ChapterTrackSink, MediaEvent, PlaybackBackend, PlayerProps, WidgetEvent,
    WidgetFactory,
};
use ballskicker_timeline::{EngineConfig, TimelineEngine, TimelineError, TimelineResult};
use js_sys::{Array, Function, Reflect};
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, HtmlTrackElement, HtmlVideoElement, Url};

/// `HTMLMediaElement.HAVE_METADATA`
const HAVE_METADATA: u16 = 1;

/// Initialize panic hook and logging for better error messages
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("[Timeline] WASM module initialized");
}

/// Options passed to the constructor from JavaScript
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TimelineOptions {
    #[serde(default)]
    props: PlayerProps,
    #[serde(default)]
    config: EngineConfig,
}

fn js_message(err: &JsValue) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    match err.dyn_ref::<js_sys::Error>() {
        Some(error) => String::from(error.message()),
        None => format!("{:?}", err),
    }
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| format!("Failed to serialize: {}", e).into())
}

// ============================================================================
// Backends
// ============================================================================

/// The `<video>` element itself.
struct NativeVideo {
    element: HtmlVideoElement,
}

impl PlaybackBackend for NativeVideo {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn is_ready(&self) -> bool {
        self.element.ready_state() >= HAVE_METADATA
    }

    fn is_paused(&self) -> bool {
        self.element.paused()
    }

    fn current_time(&self) -> Option<f64> {
        Some(self.element.current_time()).filter(|t| t.is_finite())
    }

    fn seek(&mut self, time: f64) -> TimelineResult<()> {
        self.element.set_current_time(time);
        Ok(())
    }
}

/// A JavaScript player object exposing `currentTime`, `paused` and
/// `destroy()`.
struct JsWidget {
    player: JsValue,
    ready: Rc<Cell<bool>>,
}

impl JsWidget {
    fn get(&self, key: &str) -> Option<JsValue> {
        Reflect::get(&self.player, &JsValue::from_str(key)).ok()
    }
}

impl PlaybackBackend for JsWidget {
    fn kind(&self) -> BackendKind {
        BackendKind::Widget
    }

    fn is_ready(&self) -> bool {
        self.ready.get()
    }

    fn is_paused(&self) -> bool {
        self.get("paused").and_then(|v| v.as_bool()).unwrap_or(true)
    }

    fn current_time(&self) -> Option<f64> {
        self.get("currentTime")
            .and_then(|v| v.as_f64())
            .filter(|t| t.is_finite())
    }

    fn seek(&mut self, time: f64) -> TimelineResult<()> {
        Reflect::set(&self.player, &JsValue::from_str("currentTime"), &JsValue::from_f64(time))
            .map_err(|e| TimelineError::backend(BackendKind::Widget, js_message(&e)))?;
        Ok(())
    }

    fn destroy(&mut self) -> TimelineResult<()> {
        self.ready.set(false);
        let Some(destroy) = self.get("destroy").and_then(|v| v.dyn_into::<Function>().ok()) else {
            return Ok(());
        };
        destroy
            .call0(&self.player)
            .map_err(|e| TimelineError::backend(BackendKind::Widget, js_message(&e)))?;
        Ok(())
    }
}

/// Calls the host's `construct(video)` callback, which wraps the element in
/// the third-party player.
struct JsWidgetFactory {
    construct: Function,
    element: HtmlVideoElement,
    ready: Rc<Cell<bool>>,
}

impl WidgetFactory for JsWidgetFactory {
    fn create(&mut self) -> TimelineResult<Box<dyn PlaybackBackend>> {
        let player = self
            .construct
            .call1(&JsValue::NULL, &self.element)
            .map_err(|e| TimelineError::WidgetInit(js_message(&e)))?;
        if player.is_undefined() || player.is_null() {
            return Err(TimelineError::WidgetInit("constructor returned no player".to_string()));
        }
        self.ready.set(false);
        Ok(Box::new(JsWidget {
            player,
            ready: Rc::clone(&self.ready),
        }))
    }
}

// ============================================================================
// Chapter track
// ============================================================================

/// Publishes chapter cues as a blob URL behind a `<track kind="chapters">`.
struct BlobTrackSink {
    video: HtmlVideoElement,
    track: Option<HtmlTrackElement>,
}

impl BlobTrackSink {
    fn track_element(&mut self) -> Result<&HtmlTrackElement, JsValue> {
        if self.track.is_none() {
            let document = web_sys::window()
                .and_then(|w| w.document())
                .ok_or("No document")?;
            let track = document.create_element("track")?.dyn_into::<HtmlTrackElement>()?;
            track.set_kind("chapters");
            track.set_label("Chapters");
            track.set_srclang("en");
            track.set_default(true);
            self.video.append_child(&track)?;
            self.track = Some(track);
        }
        self.track.as_ref().ok_or_else(|| "No track element".into())
    }
}

impl ChapterTrackSink for BlobTrackSink {
    fn publish(&mut self, vtt: &str) -> TimelineResult<String> {
        let options = BlobPropertyBag::new();
        options.set_type("text/vtt");
        let parts = Array::of1(&JsValue::from_str(vtt));
        let url = Blob::new_with_str_sequence_and_options(&parts, &options)
            .and_then(|blob| Url::create_object_url_with_blob(&blob))
            .map_err(|e| TimelineError::ChapterTrack(js_message(&e)))?;

        let track = self
            .track_element()
            .map_err(|e| TimelineError::ChapterTrack(js_message(&e)))?;
        track.set_src(&url);
        Ok(url)
    }

    fn revoke(&mut self, url: &str) -> TimelineResult<()> {
        if let Some(track) = &self.track {
            if track.src() == url {
                track.set_src("");
            }
        }
        Url::revoke_object_url(url).map_err(|e| TimelineError::ChapterTrack(js_message(&e)))
    }
}

impl Drop for BlobTrackSink {
    fn drop(&mut self) {
        if let Some(track) = self.track.take() {
            track.remove();
        }
    }
}

// ============================================================================
// Engine handle
// ============================================================================

/// One player instance.
#[wasm_bindgen]
pub struct WasmTimeline {
    engine: TimelineEngine,
    widget_ready: Rc<Cell<bool>>,
}

#[wasm_bindgen]
impl WasmTimeline {
    /// Create an engine from `{ props, config }`; both keys are optional.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<WasmTimeline, JsValue> {
        let options: TimelineOptions = if options.is_undefined() || options.is_null() {
            TimelineOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options).map_err(|e| format!("Failed to parse options: {}", e))?
        };
        log::info!("[Timeline] Creating engine for {:?}", options.props.video_src);
        Ok(WasmTimeline {
            engine: TimelineEngine::new(options.config, options.props),
            widget_ready: Rc::new(Cell::new(false)),
        })
    }

    #[wasm_bindgen(js_name = setProps)]
    pub fn set_props(&mut self, props: JsValue) -> Result<(), JsValue> {
        let props: PlayerProps =
            serde_wasm_bindgen::from_value(props).map_err(|e| format!("Failed to parse props: {}", e))?;
        self.engine.set_props(props);
        Ok(())
    }

    /// Attach the `<video>` element and its chapter track. Call again after
    /// `teardown`, which releases both.
    #[wasm_bindgen(js_name = attachVideo)]
    pub fn attach_video(&mut self, video: HtmlVideoElement) {
        self.engine.attach_native(Box::new(NativeVideo {
            element: video.clone(),
        }));
        self.engine.attach_chapter_sink(Box::new(BlobTrackSink { video, track: None }));
    }

    /// Build the player widget through `construct(video)`. Returns `false`
    /// when construction threw; playback continues on the bare element.
    #[wasm_bindgen(js_name = attachWidget)]
    pub fn attach_widget(&mut self, video: HtmlVideoElement, construct: Function) -> bool {
        let mut factory = JsWidgetFactory {
            construct,
            element: video,
            ready: Rc::clone(&self.widget_ready),
        };
        self.engine.attach_widget(&mut factory)
    }

    /// Feed a native media event; returns the seek it triggered, if any.
    #[wasm_bindgen(js_name = mediaEvent)]
    pub fn media_event(&mut self, event: JsValue) -> Result<JsValue, JsValue> {
        let event: MediaEvent =
            serde_wasm_bindgen::from_value(event).map_err(|e| format!("Failed to parse media event: {}", e))?;
        match self.engine.on_media_event(event) {
            Some(outcome) => to_js(&outcome),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Feed a widget event; returns the seek it triggered, if any.
    #[wasm_bindgen(js_name = widgetEvent)]
    pub fn widget_event(&mut self, event: JsValue) -> Result<JsValue, JsValue> {
        let event: WidgetEvent =
            serde_wasm_bindgen::from_value(event).map_err(|e| format!("Failed to parse widget event: {}", e))?;
        if event == WidgetEvent::Ready {
            self.widget_ready.set(true);
        }
        match self.engine.on_widget_event(event) {
            Some(outcome) => to_js(&outcome),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Poll timer tick.
    pub fn poll(&mut self) -> Option<f64> {
        self.engine.on_poll_tick()
    }

    pub fn seek(&mut self, target: f64) -> Result<JsValue, JsValue> {
        to_js(&self.engine.seek(target))
    }

    #[wasm_bindgen(js_name = seekToChapter)]
    pub fn seek_to_chapter(&mut self, index: usize) -> Result<JsValue, JsValue> {
        match self.engine.seek_to_chapter(index) {
            Some(outcome) => to_js(&outcome),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    pub fn layout(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.layout())
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.snapshot())
    }

    /// Snapshot as a JSON string, for bug reports.
    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.engine.snapshot()).map_err(|e| format!("Failed to serialize: {}", e).into())
    }

    #[wasm_bindgen(js_name = chapterTrackUrl)]
    pub fn chapter_track_url(&self) -> Option<String> {
        self.engine.chapter_track_url().map(str::to_string)
    }

    #[wasm_bindgen(js_name = wantsPolling)]
    pub fn wants_polling(&self) -> bool {
        self.engine.wants_polling()
    }

    #[wasm_bindgen(js_name = pollIntervalMs)]
    pub fn poll_interval_ms(&self) -> u32 {
        self.engine.config().poll_interval_ms
    }

    pub fn teardown(&mut self) {
        self.engine.teardown();
        self.widget_ready.set(false);
        log::info!("[Timeline] Torn down");
    }
}
