use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the show runtime.
///
/// Setup-time variants (`Configuration`, `Graphics` from compile/link, `Audio`) abort the show.
/// Per-frame GL failures never reach this type; they are handled by the GL error policy.
#[derive(Debug, Error)]
pub enum ShowError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("graphics device error: {0}")]
    Graphics(#[from] GraphicsError),

    #[error("audio device error: {0}")]
    Audio(String),

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json parse error at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ShowError {
    pub fn audio<T: Into<String>>(msg: T) -> Self {
        ShowError::Audio(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ShowError::Configuration(_))
    }
}

/// A malformed show. Always detected before any GPU object exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown {kind} '{id}' referenced by {referrer}")]
    UnknownId {
        kind: &'static str,
        id: String,
        referrer: String,
    },

    #[error("bitmap '{id}' is {width}x{height} with {bytes_per_pixel} byte(s) per pixel but holds {actual} bytes (expected {expected})")]
    BitmapSize {
        id: String,
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("show length must be at least 1 beat")]
    EmptyShow,

    #[error("bpm must be finite and positive (got {0})")]
    InvalidBpm(f64),

    #[error("script event at beat {beat} is outside the show ({length} beats)")]
    BeatOutOfRange { beat: u32, length: u32 },

    #[error("{field}: {msg}")]
    InvalidField { field: &'static str, msg: String },
}

impl ConfigError {
    pub fn unknown(kind: &'static str, id: impl Into<String>, referrer: impl Into<String>) -> Self {
        ConfigError::UnknownId {
            kind,
            id: id.into(),
            referrer: referrer.into(),
        }
    }

    pub fn invalid(field: &'static str, msg: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field,
            msg: msg.into(),
        }
    }
}

/// Failures reported by the GPU driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    #[error("vertex shader compile error: {0}")]
    VertexCompile(String),

    #[error("fragment shader compile error in {label}: {log}")]
    FragmentCompile { label: String, log: String },

    #[error("program link error in {label}: {log}")]
    Link { label: String, log: String },

    #[error("backend object creation failed: {0}")]
    Create(String),

    #[error("GL error 0x{code:04x} after {call}")]
    Device { code: u32, call: String },
}
