//! Background video configuration.
//! Describes the poster, the responsive source candidates and the element identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use dioxus::logger::tracing::warn;

/// Local storage key holding an optional JSON override of the default config.
#[cfg(target_arch = "wasm32")]
const CONFIG_KEY: &str = "herovideo.config";

const DEFAULT_ELEMENT_ID: &str = "herovideo-background";
const DEFAULT_POSTER: &str = "/video-poster.jpg";
const DEFAULT_NARROW_BREAKPOINT_PX: u32 = 820;
const DEFAULT_FALLBACK_TEXT: &str = "Your browser does not support the video tag.";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config has no video sources")]
    NoSources,

    #[error("source #{index} has an empty src")]
    EmptySource { index: usize },

    #[error("source #{index} has a zero-width media breakpoint")]
    ZeroBreakpoint { index: usize },

    #[error("element id must not be empty")]
    EmptyElementId,

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Media query attached to a `<source>` candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "px", rename_all = "snake_case")]
pub enum MediaCondition {
    MaxWidth(u32),
}

impl MediaCondition {
    pub fn matches(&self, viewport_px: u32) -> bool {
        match self {
            MediaCondition::MaxWidth(px) => viewport_px <= *px,
        }
    }
}

impl fmt::Display for MediaCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaCondition::MaxWidth(px) => write!(f, "(max-width: {px}px)"),
        }
    }
}

/// One `<source>` candidate, in preference order within the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSource {
    pub src: String,
    pub mime: String,
    #[serde(default)]
    pub media: Option<MediaCondition>,
}

impl VideoSource {
    pub fn new(src: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            mime: mime.into(),
            media: None,
        }
    }

    pub fn with_media(mut self, media: MediaCondition) -> Self {
        self.media = Some(media);
        self
    }

    /// The `media` attribute value; `None` leaves the attribute off.
    pub fn media_query(&self) -> Option<String> {
        self.media.map(|m| m.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoBackgroundConfig {
    #[serde(default = "default_element_id")]
    pub element_id: String,
    #[serde(default = "default_poster")]
    pub poster: String,
    #[serde(default = "default_sources")]
    pub sources: Vec<VideoSource>,
    #[serde(default = "default_fallback_text")]
    pub fallback_text: String,
}

fn default_element_id() -> String {
    DEFAULT_ELEMENT_ID.to_string()
}

fn default_poster() -> String {
    DEFAULT_POSTER.to_string()
}

fn default_fallback_text() -> String {
    DEFAULT_FALLBACK_TEXT.to_string()
}

/// Low-res mp4 for narrow screens, then webm, then the universal mp4.
fn default_sources() -> Vec<VideoSource> {
    vec![
        VideoSource::new("/video-720.mp4", "video/mp4")
            .with_media(MediaCondition::MaxWidth(DEFAULT_NARROW_BREAKPOINT_PX)),
        VideoSource::new("/video.webm", "video/webm"),
        VideoSource::new("/video.mp4", "video/mp4"),
    ]
}

impl Default for VideoBackgroundConfig {
    fn default() -> Self {
        Self {
            element_id: default_element_id(),
            poster: default_poster(),
            sources: default_sources(),
            fallback_text: default_fallback_text(),
        }
    }
}

impl VideoBackgroundConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.element_id.trim().is_empty() {
            return Err(ConfigError::EmptyElementId);
        }
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        for (index, source) in self.sources.iter().enumerate() {
            if source.src.trim().is_empty() {
                return Err(ConfigError::EmptySource { index });
            }
            if source.media == Some(MediaCondition::MaxWidth(0)) {
                return Err(ConfigError::ZeroBreakpoint { index });
            }
        }
        Ok(())
    }

    /// First candidate whose media condition matches and whose type is playable,
    /// mirroring how the browser walks `<source>` children.
    pub fn select_source<F>(&self, viewport_px: u32, can_play: F) -> Option<&VideoSource>
    where
        F: Fn(&str) -> bool,
    {
        self.sources.iter().find(|source| {
            source.media.map_or(true, |m| m.matches(viewport_px)) && can_play(&source.mime)
        })
    }

    /// Inline style for the container, so the poster shows through once the video is hidden.
    pub fn poster_background_style(&self) -> String {
        let poster = self.poster.replace('\\', "\\\\").replace('"', "\\\"");
        format!("background-image: url(\"{poster}\");")
    }

    /// The saved override when it parses and validates, defaults otherwise.
    pub fn from_saved(raw: Option<String>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        match Self::from_json(&raw) {
            Ok(config) => config,
            Err(err) => {
                warn!("Ignoring saved video config: {err}");
                Self::default()
            }
        }
    }

    /// Reads the override from local storage. Blocked or missing storage means defaults.
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let raw = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .and_then(|storage| storage.get_item(CONFIG_KEY).ok().flatten());
        Self::from_saved(raw)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}
