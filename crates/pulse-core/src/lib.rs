#![forbid(unsafe_code)]

//! Shared vocabulary for the pulse show runtime.
//!
//! Decoded inputs (bitmaps, PCM audio), the error taxonomy, and the JSON runtime
//! configuration live here so every other crate can agree on them without pulling in GL.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod audio;
pub mod config;
pub mod error;
pub mod image;

pub use audio::PcmAudio;
pub use config::{
    load_runtime_config, load_typed_json, DistanceFieldConfig, GlErrorPolicy, RuntimeConfig,
};
pub use error::{ConfigError, GraphicsError, ShowError};
pub use image::{BitmapImage, PixelFormat};

/// Output resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// GL wants signed sizes; zero is bumped to one so targets are never empty.
    pub fn gl_size(self) -> (i32, i32) {
        let w = i32::try_from(self.width.max(1)).unwrap_or(i32::MAX);
        let h = i32::try_from(self.height.max(1)).unwrap_or(i32::MAX);
        (w, h)
    }
}
