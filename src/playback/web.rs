//! Browser bindings for the autoplay controller.

use super::listeners::{EventSink, GestureLatch, Handler, ListenerOptions, ScopedListeners};
use super::{AutoplayController, MediaSurface, PlayCallback, PlaybackError};
use crate::config::VideoBackgroundConfig;
use dioxus::logger::tracing::debug;
use std::rc::Rc;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{window, AddEventListenerOptions, EventTarget, HtmlVideoElement};

const GESTURE_EVENTS: &[&str] = &["touchstart", "click"];

pub struct WebVideo {
    video: HtmlVideoElement,
}

impl WebVideo {
    pub fn new(video: HtmlVideoElement) -> Self {
        Self { video }
    }

    /// Builds the load error from `MediaError`, naming the source that failed.
    /// Falls back to predicting the browser's pick when `currentSrc` was never set.
    pub fn load_error(&self, config: &VideoBackgroundConfig) -> PlaybackError {
        let code = self.video.error().map(|e| e.code()).unwrap_or(0);
        let current = self.video.current_src();
        if !current.is_empty() {
            return PlaybackError::load_failed(code, Some(&current));
        }

        let viewport = window()
            .and_then(|w| w.inner_width().ok())
            .and_then(|v| v.as_f64())
            .map(|v| v.max(0.0) as u32)
            .unwrap_or(u32::MAX);
        let predicted = config
            .select_source(viewport, |mime| !self.video.can_play_type(mime).is_empty())
            .map(|s| s.src.as_str());
        PlaybackError::load_failed(code, predicted)
    }
}

fn js_string_field(value: &JsValue, field: &str) -> Option<String> {
    js_sys::Reflect::get(value, &JsValue::from_str(field))
        .ok()
        .and_then(|v| v.as_string())
}

impl MediaSurface for WebVideo {
    fn set_muted(&self, muted: bool) {
        self.video.set_muted(muted);
    }

    fn set_attribute(&self, name: &str, value: &str) {
        let _ = self.video.set_attribute(name, value);
    }

    fn set_style(&self, property: &str, value: &str) {
        let _ = self.video.style().set_property(property, value);
    }

    fn is_paused(&self) -> bool {
        self.video.paused()
    }

    fn request_play(&self, on_settled: PlayCallback) {
        let promise = match self.video.play() {
            Ok(promise) => promise,
            Err(_) => {
                on_settled(Err(PlaybackError::Unavailable));
                return;
            }
        };
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = wasm_bindgen_futures::JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|err| PlaybackError::Rejected {
                    name: js_string_field(&err, "name").unwrap_or_else(|| "Error".to_string()),
                    message: js_string_field(&err, "message")
                        .or_else(|| err.as_string())
                        .unwrap_or_default(),
                });
            on_settled(outcome);
        });
    }
}

/// Listener registration on a DOM `EventTarget`.
pub struct DomEventSink {
    target: EventTarget,
}

impl DomEventSink {
    pub fn new(target: EventTarget) -> Self {
        Self { target }
    }
}

pub struct DomListener {
    event: &'static str,
    closure: Closure<dyn FnMut()>,
}

impl EventSink for DomEventSink {
    type Token = DomListener;

    fn attach(
        &self,
        event: &'static str,
        options: ListenerOptions,
        handler: Handler,
    ) -> Option<DomListener> {
        let closure = Closure::wrap(Box::new(move || handler()) as Box<dyn FnMut()>);
        let opts = AddEventListenerOptions::new();
        opts.set_passive(options.passive);
        self.target
            .add_event_listener_with_callback_and_add_event_listener_options(
                event,
                closure.as_ref().unchecked_ref(),
                &opts,
            )
            .ok()?;
        Some(DomListener { event, closure })
    }

    fn detach(&self, token: &DomListener) {
        // Removing a listener that is not registered is a no-op in the DOM.
        let _ = self.target.remove_event_listener_with_callback(
            token.event,
            token.closure.as_ref().unchecked_ref(),
        );
    }
}

/// Everything a mounted background video owns. Dropping it detaches every listener
/// and releases the element.
pub struct MountedVideo {
    controller: Rc<AutoplayController<WebVideo>>,
    gesture: GestureLatch,
    _document_listeners: ScopedListeners<DomEventSink>,
    _media_listeners: ScopedListeners<DomEventSink>,
}

impl MountedVideo {
    /// Returns `None` when the element is not in the document yet.
    pub fn attach(config: &VideoBackgroundConfig) -> Option<Self> {
        let document = window()?.document()?;
        let Some(element) = document.get_element_by_id(&config.element_id) else {
            debug!("Background video #{} not found, skipping setup", config.element_id);
            return None;
        };
        let video: HtmlVideoElement = element.dyn_into().ok()?;

        let controller = Rc::new(AutoplayController::new(WebVideo::new(video.clone())));
        controller.on_mount();

        let document_listeners = ScopedListeners::new(DomEventSink::new(EventTarget::from(document)));
        let gesture = {
            let controller = controller.clone();
            document_listeners.listen_once_any(
                GESTURE_EVENTS,
                ListenerOptions::PASSIVE,
                move || controller.on_user_gesture(),
            )
        };

        let media_listeners = ScopedListeners::new(DomEventSink::new(EventTarget::from(video)));
        {
            let controller = controller.clone();
            media_listeners.listen(
                "loadeddata",
                ListenerOptions::default(),
                Rc::new(move || controller.on_loaded_data()),
            );
        }
        {
            let controller = controller.clone();
            let config = config.clone();
            media_listeners.listen(
                "error",
                ListenerOptions::default(),
                Rc::new(move || {
                    let error = controller.media().load_error(&config);
                    controller.on_load_error(error);
                }),
            );
        }

        Some(Self {
            controller,
            gesture,
            _document_listeners: document_listeners,
            _media_listeners: media_listeners,
        })
    }
}

impl Drop for MountedVideo {
    fn drop(&mut self) {
        let stats = self.controller.stats();
        debug!(
            "Background video unmounted: {} play requests, {} rejected, gesture handled: {}, failed: {}",
            stats.play_requests,
            stats.rejections,
            self.gesture.has_fired(),
            self.controller.has_failed(),
        );
    }
}
