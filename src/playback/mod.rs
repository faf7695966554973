//! Autoplay handling for the background video.
//! Keeps the browser-facing code thin: everything here runs against the `MediaSurface`
//! seam so mount, gesture, load and error handling can be driven without a DOM.

pub mod listeners;
#[cfg(target_arch = "wasm32")]
pub mod web;

use dioxus::logger::tracing::{debug, warn};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Attributes some mobile browsers check instead of the matching properties.
const AUTOPLAY_ATTRIBUTES: &[(&str, &str)] = &[
    ("muted", ""),
    ("playsinline", ""),
    ("webkit-playsinline", ""),
    ("x-webkit-airplay", "allow"),
];

const COVER_STYLE: &[(&str, &str)] = &[
    ("width", "100%"),
    ("height", "100%"),
    ("object-fit", "cover"),
    ("object-position", "center center"),
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    /// The play promise settled as rejected, usually `NotAllowedError` from an autoplay policy.
    #[error("play request rejected ({name}): {message}")]
    Rejected { name: String, message: String },

    /// `play()` threw before handing back a promise.
    #[error("play request could not be issued")]
    Unavailable,

    #[error("media failed to load (code {code}): {message}")]
    LoadFailed { code: u16, message: String },
}

impl PlaybackError {
    /// Maps a `MediaError.code` to a readable description.
    pub fn load_failed(code: u16, source: Option<&str>) -> Self {
        let reason = match code {
            1 => "fetching was aborted",
            2 => "a network error interrupted the download",
            3 => "the media could not be decoded",
            4 => "no supported source was found",
            _ => "the media could not be loaded",
        };
        let message = match source {
            Some(src) if !src.is_empty() => format!("{reason} ({src})"),
            _ => reason.to_string(),
        };
        Self::LoadFailed { code, message }
    }
}

/// What caused a play request; only used to label log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayTrigger {
    Mount,
    DataLoaded,
    UserGesture,
}

impl fmt::Display for PlayTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlayTrigger::Mount => "mount",
            PlayTrigger::DataLoaded => "data loaded",
            PlayTrigger::UserGesture => "user interaction",
        };
        f.write_str(label)
    }
}

pub type PlayCallback = Box<dyn FnOnce(Result<(), PlaybackError>)>;

/// The parts of a media element the autoplay logic touches.
pub trait MediaSurface {
    fn set_muted(&self, muted: bool);
    fn set_attribute(&self, name: &str, value: &str);
    fn set_style(&self, property: &str, value: &str);
    fn is_paused(&self) -> bool;
    /// Starts playback and reports the outcome later through `on_settled`.
    /// Must not block and must not call `on_settled` re-entrantly while the caller holds borrows.
    fn request_play(&self, on_settled: PlayCallback);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AutoplayStats {
    pub play_requests: u32,
    pub rejections: u32,
    pub gestures_handled: u32,
}

#[derive(Default)]
struct Counters {
    play_requests: Cell<u32>,
    rejections: Cell<u32>,
    gestures_handled: Cell<u32>,
}

/// Drives one mounted media element.
///
/// Every entry point is safe to call repeatedly. After a load error the controller is
/// failed for good and every entry point turns into a no-op.
pub struct AutoplayController<M: MediaSurface> {
    media: M,
    failed: Cell<bool>,
    counters: Rc<Counters>,
}

impl<M: MediaSurface> AutoplayController<M> {
    pub fn new(media: M) -> Self {
        Self {
            media,
            failed: Cell::new(false),
            counters: Rc::new(Counters::default()),
        }
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn has_failed(&self) -> bool {
        self.failed.get()
    }

    pub fn stats(&self) -> AutoplayStats {
        AutoplayStats {
            play_requests: self.counters.play_requests.get(),
            rejections: self.counters.rejections.get(),
            gestures_handled: self.counters.gestures_handled.get(),
        }
    }

    /// Forces the muted/inline flags autoplay policies require, then asks for playback.
    pub fn assert_autoplay_invariants(&self, trigger: PlayTrigger) {
        if self.failed.get() {
            return;
        }
        self.media.set_muted(true);
        for (name, value) in AUTOPLAY_ATTRIBUTES {
            self.media.set_attribute(name, value);
        }
        self.play(trigger);
    }

    pub fn on_mount(&self) {
        debug!("Background video mounted");
        self.assert_autoplay_invariants(PlayTrigger::Mount);
    }

    /// First touch or click anywhere on the page.
    pub fn on_user_gesture(&self) {
        if self.failed.get() {
            return;
        }
        self.counters
            .gestures_handled
            .set(self.counters.gestures_handled.get() + 1);
        if self.media.is_paused() {
            self.play(PlayTrigger::UserGesture);
        }
    }

    /// Some browsers reset the inline flags or layout once the first frame arrives.
    pub fn on_loaded_data(&self) {
        if self.failed.get() {
            return;
        }
        for (property, value) in COVER_STYLE {
            self.media.set_style(property, value);
        }
        self.assert_autoplay_invariants(PlayTrigger::DataLoaded);
    }

    /// Hides the element so the poster background shows through. Terminal.
    pub fn on_load_error(&self, error: PlaybackError) {
        warn!("Video failed to load: {error}");
        self.failed.set(true);
        self.media.set_style("display", "none");
    }

    fn play(&self, trigger: PlayTrigger) {
        self.counters
            .play_requests
            .set(self.counters.play_requests.get() + 1);
        let counters = self.counters.clone();
        self.media.request_play(Box::new(move |outcome| match outcome {
            Ok(()) => debug!("Video playback started after {trigger}"),
            // One rejection, one warning: the counter moves in lockstep with this `warn!`.
            Err(err) => {
                counters.rejections.set(counters.rejections.get() + 1);
                warn!("Video play failed after {trigger}: {err}");
            }
        }));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// Settles play requests only when told to, like a browser promise.
    #[derive(Default)]
    pub struct FakeMedia {
        pub muted: Cell<bool>,
        pub paused: Cell<bool>,
        pub attributes: RefCell<BTreeMap<String, String>>,
        pub style: RefCell<BTreeMap<String, String>>,
        pub pending: RefCell<Vec<PlayCallback>>,
        pub play_calls: Cell<u32>,
    }

    impl FakeMedia {
        pub fn paused() -> Rc<Self> {
            let media = Self::default();
            media.paused.set(true);
            Rc::new(media)
        }

        pub fn style(&self, property: &str) -> Option<String> {
            self.style.borrow().get(property).cloned()
        }

        pub fn attribute(&self, name: &str) -> Option<String> {
            self.attributes.borrow().get(name).cloned()
        }

        /// Settles every outstanding request with the given outcome.
        pub fn settle_all(&self, outcome: Result<(), PlaybackError>) {
            let pending: Vec<PlayCallback> = self.pending.borrow_mut().drain(..).collect();
            for callback in pending {
                if outcome.is_ok() {
                    self.paused.set(false);
                }
                callback(outcome.clone());
            }
        }
    }

    impl MediaSurface for Rc<FakeMedia> {
        fn set_muted(&self, muted: bool) {
            self.muted.set(muted);
        }

        fn set_attribute(&self, name: &str, value: &str) {
            self.attributes
                .borrow_mut()
                .insert(name.to_string(), value.to_string());
        }

        fn set_style(&self, property: &str, value: &str) {
            self.style
                .borrow_mut()
                .insert(property.to_string(), value.to_string());
        }

        fn is_paused(&self) -> bool {
            self.paused.get()
        }

        fn request_play(&self, on_settled: PlayCallback) {
            self.play_calls.set(self.play_calls.get() + 1);
            self.pending.borrow_mut().push(on_settled);
        }
    }

    pub fn not_allowed() -> PlaybackError {
        PlaybackError::Rejected {
            name: "NotAllowedError".to_string(),
            message: "play() failed because the user didn't interact with the document first"
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn mount_sets_autoplay_flags_and_requests_play() {
        let media = FakeMedia::paused();
        let controller = AutoplayController::new(media.clone());

        controller.on_mount();

        assert!(media.muted.get());
        assert_eq!(media.attribute("muted").as_deref(), Some(""));
        assert_eq!(media.attribute("playsinline").as_deref(), Some(""));
        assert_eq!(media.attribute("webkit-playsinline").as_deref(), Some(""));
        assert_eq!(media.attribute("x-webkit-airplay").as_deref(), Some("allow"));
        assert_eq!(media.play_calls.get(), 1);
    }

    #[test]
    fn rejected_play_is_counted_once_and_leaves_element_paused() {
        let media = FakeMedia::paused();
        let controller = AutoplayController::new(media.clone());

        controller.on_mount();
        media.settle_all(Err(not_allowed()));

        // `rejections` is bumped next to the only `warn!` in the play callback.
        let stats = controller.stats();
        assert_eq!(stats.play_requests, 1);
        assert_eq!(stats.rejections, 1);
        assert!(media.is_paused());
        assert!(!controller.has_failed());
        assert_eq!(media.style("display"), None);
    }

    #[test]
    fn gesture_replays_only_while_paused() {
        let media = FakeMedia::paused();
        let controller = AutoplayController::new(media.clone());

        controller.on_user_gesture();
        assert_eq!(media.play_calls.get(), 1);

        media.settle_all(Ok(()));
        controller.on_user_gesture();
        assert_eq!(media.play_calls.get(), 1);
        assert_eq!(controller.stats().gestures_handled, 2);
    }

    #[test]
    fn loaded_data_forces_cover_fit_over_prior_style() {
        let media = FakeMedia::paused();
        media.set_style("width", "320px");
        media.set_style("object-fit", "contain");
        media.set_muted(false);
        let controller = AutoplayController::new(media.clone());

        controller.on_loaded_data();

        assert_eq!(media.style("width").as_deref(), Some("100%"));
        assert_eq!(media.style("height").as_deref(), Some("100%"));
        assert_eq!(media.style("object-fit").as_deref(), Some("cover"));
        assert_eq!(media.style("object-position").as_deref(), Some("center center"));
        assert!(media.muted.get());
        assert_eq!(media.play_calls.get(), 1);
    }

    #[test]
    fn load_error_hides_element_and_stops_all_play_requests() {
        let media = FakeMedia::paused();
        let controller = AutoplayController::new(media.clone());

        controller.on_mount();
        controller.on_load_error(PlaybackError::load_failed(4, Some("/video.webm")));
        assert_eq!(media.style("display").as_deref(), Some("none"));
        assert!(controller.has_failed());

        controller.on_user_gesture();
        controller.on_loaded_data();
        controller.assert_autoplay_invariants(PlayTrigger::Mount);

        assert_eq!(media.play_calls.get(), 1);
        assert_eq!(media.style("object-fit"), None);
    }

    #[test]
    fn invariants_are_idempotent() {
        let media = FakeMedia::paused();
        let controller = AutoplayController::new(media.clone());

        controller.assert_autoplay_invariants(PlayTrigger::Mount);
        let first = media.attributes.borrow().clone();
        controller.assert_autoplay_invariants(PlayTrigger::DataLoaded);

        assert_eq!(*media.attributes.borrow(), first);
        assert_eq!(media.play_calls.get(), 2);
    }

    #[test]
    fn first_gesture_gives_one_extra_attempt_per_mount() {
        use super::listeners::testing::FakeDocument;
        use super::listeners::{ListenerOptions, ScopedListeners};

        let doc = Rc::new(FakeDocument::default());
        for _ in 0..3 {
            let media = FakeMedia::paused();
            let controller = Rc::new(AutoplayController::new(media.clone()));
            let scope = ScopedListeners::new(doc.clone());
            controller.on_mount();
            media.settle_all(Err(not_allowed()));
            {
                let controller = controller.clone();
                scope.listen_once_any(&["touchstart", "click"], ListenerOptions::PASSIVE, move || {
                    controller.on_user_gesture()
                });
            }

            doc.dispatch("click");
            doc.dispatch("touchstart");
            doc.dispatch("click");
            assert_eq!(media.play_calls.get(), 2);
            assert_eq!(controller.stats().gestures_handled, 1);
            drop(scope);
        }
        assert_eq!(doc.active_count(), 0);
        assert_eq!(doc.attached.get(), 6);
        assert_eq!(doc.detached.get(), 6);
    }

    #[test]
    fn load_error_messages_name_the_source() {
        let err = PlaybackError::load_failed(2, Some("/video-720.mp4"));
        assert_eq!(
            err.to_string(),
            "media failed to load (code 2): a network error interrupted the download (/video-720.mp4)"
        );
        let unknown = PlaybackError::load_failed(9, None);
        assert_eq!(
            unknown,
            PlaybackError::LoadFailed {
                code: 9,
                message: "the media could not be loaded".to_string()
            }
        );
    }
}
