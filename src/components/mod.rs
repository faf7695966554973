//! The components module contains all shared components for our app.

mod video_background;

pub use video_background::*;
