use dioxus::logger::tracing::Level;
use dioxus::prelude::*;

mod components;
mod config;
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
mod playback;

use components::VideoBackground;
use config::VideoBackgroundConfig;

const HERO_CSS: Asset = asset!("/assets/styling/hero.css");

fn main() {
    if let Err(err) = dioxus::logger::init(Level::INFO) {
        eprintln!("Failed to initialize logger: {err}");
    }
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    let config = use_hook(VideoBackgroundConfig::load);

    rsx! {
        document::Meta { name: "theme-color", content: "#0d0d0d" }
        document::Meta { name: "mobile-web-app-capable", content: "yes" }
        document::Stylesheet { href: HERO_CSS }

        VideoBackground { config }
    }
}
