use crate::config::VideoBackgroundConfig;
use dioxus::prelude::*;

#[cfg(target_arch = "wasm32")]
use crate::playback::web::MountedVideo;
#[cfg(target_arch = "wasm32")]
use std::{cell::RefCell, rc::Rc};

/// Full-bleed looping video used as a page backdrop.
///
/// Autoplay is best effort: if the browser blocks it or the media fails to load, the
/// poster stays visible instead.
#[component]
pub fn VideoBackground(#[props(default)] config: VideoBackgroundConfig) -> Element {
    // Mount wiring lives outside the render cycle; teardown drops it on every exit path.
    #[cfg(target_arch = "wasm32")]
    {
        let session = use_hook(|| Rc::new(RefCell::new(None::<MountedVideo>)));
        {
            let session = session.clone();
            let config = config.clone();
            use_effect(move || {
                if session.borrow().is_some() {
                    return;
                }
                let mounted = MountedVideo::attach(&config);
                *session.borrow_mut() = mounted;
            });
        }
        use_drop(move || {
            session.borrow_mut().take();
        });
    }

    rsx! {
        div {
            class: "hero-section",
            style: "{config.poster_background_style()}",
            video {
                id: "{config.element_id}",
                class: "hero-video",
                autoplay: true,
                playsinline: true,
                r#loop: true,
                muted: true,
                preload: "auto",
                poster: "{config.poster}",
                "webkit-playsinline": "true",
                "x-webkit-airplay": "allow",
                for candidate in config.sources.iter() {
                    source {
                        key: "{candidate.src}",
                        src: "{candidate.src}",
                        r#type: "{candidate.mime}",
                        "media": candidate.media_query(),
                    }
                }
                "{config.fallback_text}"
            }
        }
    }
}
